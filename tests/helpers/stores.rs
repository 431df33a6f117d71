//! Scripted event stores
//!
//! Wrap the in-memory store to inject transient failures, lost races and
//! broken conditional writes.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use EventHub::database::{EventStore, InMemoryEventStore, JoinGuard};
use EventHub::models::event::Event;
use EventHub::utils::errors::{StoreError, StoreResult};

/// Decrement `counter` if positive; true when a unit was taken
fn take(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Fails the first `failures` conditional writes with `error`
pub struct FlakyStore {
    pub inner: Arc<InMemoryEventStore>,
    failures: AtomicU32,
    error: StoreError,
    pub write_calls: AtomicU32,
}

impl FlakyStore {
    pub fn new(inner: Arc<InMemoryEventStore>, failures: u32, error: StoreError) -> Self {
        Self {
            inner,
            failures: AtomicU32::new(failures),
            error,
            write_calls: AtomicU32::new(0),
        }
    }

    pub fn write_calls(&self) -> u32 {
        self.write_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventStore for FlakyStore {
    async fn read_event(&self, event_id: Uuid) -> StoreResult<Option<Event>> {
        self.inner.read_event(event_id).await
    }

    async fn add_attendee_if(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        guard: JoinGuard,
    ) -> StoreResult<Option<Event>> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if take(&self.failures) {
            return Err(self.error.clone());
        }
        self.inner.add_attendee_if(event_id, user_id, guard).await
    }

    async fn remove_attendee_if_member(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Event>> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if take(&self.failures) {
            return Err(self.error.clone());
        }
        self.inner.remove_attendee_if_member(event_id, user_id).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }
}

/// Applies the first join but reports a timeout, as if the acknowledgement was lost
pub struct LostAckStore {
    pub inner: Arc<InMemoryEventStore>,
    lost: AtomicU32,
}

impl LostAckStore {
    pub fn new(inner: Arc<InMemoryEventStore>) -> Self {
        Self {
            inner,
            lost: AtomicU32::new(1),
        }
    }
}

#[async_trait]
impl EventStore for LostAckStore {
    async fn read_event(&self, event_id: Uuid) -> StoreResult<Option<Event>> {
        self.inner.read_event(event_id).await
    }

    async fn add_attendee_if(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        guard: JoinGuard,
    ) -> StoreResult<Option<Event>> {
        let applied = self.inner.add_attendee_if(event_id, user_id, guard).await?;
        if applied.is_some() && take(&self.lost) {
            return Err(StoreError::Timeout);
        }
        Ok(applied)
    }

    async fn remove_attendee_if_member(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Event>> {
        self.inner.remove_attendee_if_member(event_id, user_id).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }
}

/// Reports the first `races` joins as unmatched although the event would admit
/// them, as when a seat frees up between the write and the diagnostic read
pub struct RacingStore {
    pub inner: Arc<InMemoryEventStore>,
    races: AtomicU32,
}

impl RacingStore {
    pub fn new(inner: Arc<InMemoryEventStore>, races: u32) -> Self {
        Self {
            inner,
            races: AtomicU32::new(races),
        }
    }
}

#[async_trait]
impl EventStore for RacingStore {
    async fn read_event(&self, event_id: Uuid) -> StoreResult<Option<Event>> {
        self.inner.read_event(event_id).await
    }

    async fn add_attendee_if(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        guard: JoinGuard,
    ) -> StoreResult<Option<Event>> {
        if take(&self.races) {
            return Ok(None);
        }
        self.inner.add_attendee_if(event_id, user_id, guard).await
    }

    async fn remove_attendee_if_member(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Event>> {
        self.inner.remove_attendee_if_member(event_id, user_id).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }
}

/// Appends without evaluating the guard, i.e. a non-atomic store
pub struct OvercommitStore {
    pub inner: Arc<InMemoryEventStore>,
}

#[async_trait]
impl EventStore for OvercommitStore {
    async fn read_event(&self, event_id: Uuid) -> StoreResult<Option<Event>> {
        self.inner.read_event(event_id).await
    }

    async fn add_attendee_if(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        _guard: JoinGuard,
    ) -> StoreResult<Option<Event>> {
        let Some(mut event) = self.inner.read_event(event_id).await? else {
            return Ok(None);
        };
        event.attendees.push(user_id);
        event.updated_at = Utc::now();
        self.inner.put(event.clone())?;
        Ok(Some(event))
    }

    async fn remove_attendee_if_member(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Event>> {
        self.inner.remove_attendee_if_member(event_id, user_id).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }
}
