//! Event query service
//!
//! Listing, lookup and creator-only management of events. Attendee sets are
//! never written here; joins and leaves go through the admission controller.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::store::{SharedEventCatalog, SharedEventStore};
use crate::models::event::{
    CreateEventRequest, Event, EventFilter, MyEvents, NewEvent, UpdateEventRequest,
};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::logging::log_event_action;

#[derive(Clone)]
pub struct EventService {
    catalog: SharedEventCatalog,
    store: SharedEventStore,
}

impl EventService {
    pub fn new(catalog: SharedEventCatalog, store: SharedEventStore) -> Self {
        Self { catalog, store }
    }

    /// List events matching `filter`, ordered by start time
    pub async fn list(&self, filter: &EventFilter, now: DateTime<Utc>) -> Result<Vec<Event>> {
        debug!(?filter, "Listing events");
        Ok(self.catalog.list(filter, now).await?)
    }

    pub async fn get(&self, event_id: Uuid) -> Result<Event> {
        self.store
            .read_event(event_id)
            .await?
            .ok_or(EventHubError::EventNotFound { event_id })
    }

    pub async fn create(&self, creator_id: Uuid, request: CreateEventRequest) -> Result<Event> {
        let new_event = validate_create(creator_id, request)?;
        let event = self.catalog.insert(new_event).await?;

        log_event_action(event.id, "create", creator_id, Some(event.title.as_str()));
        Ok(event)
    }

    /// Update an event; only its creator may do so
    pub async fn update(
        &self,
        event_id: Uuid,
        editor_id: Uuid,
        request: UpdateEventRequest,
    ) -> Result<Event> {
        let changes = validate_update(request)?;
        let requested_capacity = changes.capacity;

        if let Some(event) = self
            .catalog
            .update_if_creator(event_id, editor_id, changes)
            .await?
        {
            log_event_action(event_id, "update", editor_id, None);
            return Ok(event);
        }

        let event = self.get(event_id).await?;
        if event.creator_id != editor_id {
            warn!(%event_id, %editor_id, "Rejected update by non-creator");
            return Err(EventHubError::PermissionDenied(
                "Not authorized to update this event".to_string(),
            ));
        }

        Err(EventHubError::InvalidInput(format!(
            "Capacity {} is below the current attendee count {}",
            requested_capacity.unwrap_or(event.capacity),
            event.attendee_count()
        )))
    }

    /// Delete an event; only its creator may do so
    pub async fn delete(&self, event_id: Uuid, requester_id: Uuid) -> Result<()> {
        if self.catalog.delete_if_creator(event_id, requester_id).await? {
            info!(%event_id, %requester_id, "Event deleted");
            log_event_action(event_id, "delete", requester_id, None);
            return Ok(());
        }

        // Not deleted: either missing or owned by someone else
        self.get(event_id).await?;
        Err(EventHubError::PermissionDenied(
            "Not authorized to delete this event".to_string(),
        ))
    }

    /// Events the user created and, separately, events they attend
    pub async fn my_events(&self, user_id: Uuid) -> Result<MyEvents> {
        let (created, attending) = futures::try_join!(
            self.catalog.created_by(user_id),
            self.catalog.attending(user_id)
        )?;

        Ok(MyEvents { created, attending })
    }
}

fn required(field: &str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EventHubError::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn valid_capacity(capacity: i32) -> Result<i32> {
    if capacity < 1 {
        return Err(EventHubError::InvalidInput(
            "Capacity must be at least 1".to_string(),
        ));
    }
    Ok(capacity)
}

fn validate_create(creator_id: Uuid, request: CreateEventRequest) -> Result<NewEvent> {
    Ok(NewEvent {
        title: required("Title", request.title)?,
        description: required("Description", request.description)?,
        event_date: request.event_date,
        location: required("Location", request.location)?,
        category: request.category.unwrap_or_default(),
        capacity: valid_capacity(request.capacity)?,
        image: request.image.filter(|image| !image.trim().is_empty()),
        creator_id,
    })
}

fn validate_update(request: UpdateEventRequest) -> Result<UpdateEventRequest> {
    Ok(UpdateEventRequest {
        title: request.title.map(|v| required("Title", v)).transpose()?,
        description: request
            .description
            .map(|v| required("Description", v))
            .transpose()?,
        event_date: request.event_date,
        location: request.location.map(|v| required("Location", v)).transpose()?,
        category: request.category,
        capacity: request.capacity.map(valid_capacity).transpose()?,
        image: request.image,
    })
}
