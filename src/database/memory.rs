//! In-process event store
//!
//! Keeps events in a map behind a single lock. Every conditional mutation runs
//! its check and its write inside one critical section, which plays the role
//! of the row lock in the PostgreSQL store. The lock is never held across an
//! await point.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::store::{EventCatalog, EventStore, JoinGuard};
use crate::models::event::{Event, EventFilter, NewEvent, UpdateEventRequest};
use crate::utils::errors::{StoreError, StoreResult};

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<HashMap<Uuid, Event>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed event as-is (fixtures, imports)
    pub fn put(&self, event: Event) -> StoreResult<()> {
        self.write()?.insert(event.id, event);
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<Uuid, Event>>> {
        self.events
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<Uuid, Event>>> {
        self.events
            .write()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn sorted(mut events: Vec<Event>) -> Vec<Event> {
        events.sort_by(|a, b| a.event_date.cmp(&b.event_date).then(a.id.cmp(&b.id)));
        events
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn read_event(&self, event_id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.read()?.get(&event_id).cloned())
    }

    async fn add_attendee_if(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        guard: JoinGuard,
    ) -> StoreResult<Option<Event>> {
        let mut events = self.write()?;
        let Some(event) = events.get_mut(&event_id) else {
            return Ok(None);
        };

        if !guard.admits(event, user_id) {
            return Ok(None);
        }

        event.attendees.push(user_id);
        event.updated_at = Utc::now();
        Ok(Some(event.clone()))
    }

    async fn remove_attendee_if_member(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Event>> {
        let mut events = self.write()?;
        let Some(event) = events.get_mut(&event_id) else {
            return Ok(None);
        };

        if !event.is_attending(user_id) {
            return Ok(None);
        }

        event.attendees.retain(|attendee| *attendee != user_id);
        event.updated_at = Utc::now();
        Ok(Some(event.clone()))
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.read().map(|_| ())
    }
}

#[async_trait]
impl EventCatalog for InMemoryEventStore {
    async fn insert(&self, new_event: NewEvent) -> StoreResult<Event> {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            title: new_event.title,
            description: new_event.description,
            event_date: new_event.event_date,
            location: new_event.location,
            category: new_event.category,
            capacity: new_event.capacity,
            image: new_event.image,
            creator_id: new_event.creator_id,
            attendees: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.write()?.insert(event.id, event.clone());
        Ok(event)
    }

    async fn update_if_creator(
        &self,
        event_id: Uuid,
        editor_id: Uuid,
        changes: UpdateEventRequest,
    ) -> StoreResult<Option<Event>> {
        let mut events = self.write()?;
        let Some(event) = events.get_mut(&event_id) else {
            return Ok(None);
        };

        if event.creator_id != editor_id {
            return Ok(None);
        }
        if let Some(capacity) = changes.capacity {
            if (capacity as i64) < event.attendees.len() as i64 {
                return Ok(None);
            }
        }

        if let Some(title) = changes.title {
            event.title = title;
        }
        if let Some(description) = changes.description {
            event.description = description;
        }
        if let Some(event_date) = changes.event_date {
            event.event_date = event_date;
        }
        if let Some(location) = changes.location {
            event.location = location;
        }
        if let Some(category) = changes.category {
            event.category = category;
        }
        if let Some(capacity) = changes.capacity {
            event.capacity = capacity;
        }
        if let Some(image) = changes.image {
            event.image = Some(image);
        }
        event.updated_at = Utc::now();

        Ok(Some(event.clone()))
    }

    async fn delete_if_creator(&self, event_id: Uuid, requester_id: Uuid) -> StoreResult<bool> {
        let mut events = self.write()?;
        let owned = events
            .get(&event_id)
            .map(|event| event.creator_id == requester_id)
            .unwrap_or(false);
        if owned {
            events.remove(&event_id);
        }
        Ok(owned)
    }

    async fn list(&self, filter: &EventFilter, now: DateTime<Utc>) -> StoreResult<Vec<Event>> {
        let matching: Vec<Event> = self
            .read()?
            .values()
            .filter(|event| filter.matches(event, now))
            .cloned()
            .collect();

        Ok(Self::sorted(matching)
            .into_iter()
            .skip(filter.effective_offset() as usize)
            .take(filter.effective_limit() as usize)
            .collect())
    }

    async fn created_by(&self, user_id: Uuid) -> StoreResult<Vec<Event>> {
        let created = self
            .read()?
            .values()
            .filter(|event| event.creator_id == user_id)
            .cloned()
            .collect();
        Ok(Self::sorted(created))
    }

    async fn attending(&self, user_id: Uuid) -> StoreResult<Vec<Event>> {
        let attending = self
            .read()?
            .values()
            .filter(|event| event.creator_id != user_id && event.is_attending(user_id))
            .cloned()
            .collect();
        Ok(Self::sorted(attending))
    }
}
