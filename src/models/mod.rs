//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod event;

// Re-export commonly used models
pub use event::{
    CreateEventRequest, Event, EventCategory, EventFilter, EventRow, EventSnapshot, MyEvents,
    NewEvent, RsvpAction, UpdateEventRequest,
};
