//! Event store seam
//!
//! The admission controller and the event query service talk to storage only
//! through these traits, so the same logic runs against PostgreSQL and the
//! in-process store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::event::{Event, EventFilter, NewEvent, UpdateEventRequest};
use crate::utils::errors::StoreResult;

/// Store-side condition for adding an attendee.
///
/// The add applies only if, at the moment of mutation, the event starts after
/// `now`, has a free seat, and does not already list the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinGuard {
    pub now: DateTime<Utc>,
}

impl JoinGuard {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Evaluate the guard against a snapshot
    pub fn admits(&self, event: &Event, user_id: Uuid) -> bool {
        event.event_date > self.now && !event.is_full() && !event.is_attending(user_id)
    }
}

/// Attendee-set access used by the admission controller
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Read the current state of one event
    async fn read_event(&self, event_id: Uuid) -> StoreResult<Option<Event>>;

    /// Append `user_id` to the attendee set if `guard` holds at the moment of
    /// mutation. Returns the updated event, or `None` if no event matched.
    async fn add_attendee_if(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        guard: JoinGuard,
    ) -> StoreResult<Option<Event>>;

    /// Remove `user_id` from the attendee set if it is a member. Returns the
    /// updated event, or `None` if the event is missing or the user was not a member.
    async fn remove_attendee_if_member(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Event>>;

    /// Cheap liveness check
    async fn health_check(&self) -> StoreResult<()>;
}

/// Catalog operations used by the event query service
#[async_trait]
pub trait EventCatalog: Send + Sync {
    async fn insert(&self, event: NewEvent) -> StoreResult<Event>;

    /// Apply `changes` if `editor_id` created the event and the resulting
    /// capacity still covers the current attendees. `None` if nothing matched.
    async fn update_if_creator(
        &self,
        event_id: Uuid,
        editor_id: Uuid,
        changes: UpdateEventRequest,
    ) -> StoreResult<Option<Event>>;

    /// Delete the event if `requester_id` created it. Returns whether a row was removed.
    async fn delete_if_creator(&self, event_id: Uuid, requester_id: Uuid) -> StoreResult<bool>;

    async fn list(&self, filter: &EventFilter, now: DateTime<Utc>) -> StoreResult<Vec<Event>>;

    async fn created_by(&self, user_id: Uuid) -> StoreResult<Vec<Event>>;

    /// Events the user attends but did not create
    async fn attending(&self, user_id: Uuid) -> StoreResult<Vec<Event>>;
}

pub type SharedEventStore = Arc<dyn EventStore>;
pub type SharedEventCatalog = Arc<dyn EventCatalog>;
