//! EventHub
//!
//! Event listing and RSVP service. Users browse upcoming events, create and
//! manage their own, and join or leave events subject to each event's
//! capacity. Joins are admitted by a single conditional write against the
//! event store, so the attendee count never exceeds capacity and no user is
//! listed twice, however many requests race for the last seat.

#![allow(non_snake_case)]

pub mod api;
pub mod config;
pub mod database;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{AdmissionError, EventHubError, Result, StoreError};

// Re-export main components for easy access
pub use api::{build_router, AppState};
pub use database::DatabaseService;
pub use services::{AdmissionController, EventService, ServiceFactory};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
