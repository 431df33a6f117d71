//! Event model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Fixed set of event categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EventCategory {
    Technology,
    Business,
    Arts,
    Sports,
    Education,
    #[serde(rename = "Food & Drink")]
    FoodAndDrink,
    Music,
    Networking,
    #[default]
    Other,
}

impl EventCategory {
    pub const ALL: [EventCategory; 9] = [
        EventCategory::Technology,
        EventCategory::Business,
        EventCategory::Arts,
        EventCategory::Sports,
        EventCategory::Education,
        EventCategory::FoodAndDrink,
        EventCategory::Music,
        EventCategory::Networking,
        EventCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Technology => "Technology",
            EventCategory::Business => "Business",
            EventCategory::Arts => "Arts",
            EventCategory::Sports => "Sports",
            EventCategory::Education => "Education",
            EventCategory::FoodAndDrink => "Food & Drink",
            EventCategory::Music => "Music",
            EventCategory::Networking => "Networking",
            EventCategory::Other => "Other",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        EventCategory::ALL
            .iter()
            .copied()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("Unknown event category: {}", trimmed))
    }
}

/// An event together with its attendee set.
///
/// This is also the snapshot handed back by the admission controller after a
/// join or leave: `attendees.len()` is the confirmed attendee count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub location: String,
    pub category: EventCategory,
    pub capacity: i32,
    pub image: Option<String>,
    pub creator_id: Uuid,
    pub attendees: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot type returned by RSVP operations
pub type EventSnapshot = Event;

impl Event {
    pub fn attendee_count(&self) -> usize {
        self.attendees.len()
    }

    pub fn is_attending(&self, user_id: Uuid) -> bool {
        self.attendees.contains(&user_id)
    }

    pub fn is_full(&self) -> bool {
        self.attendees.len() as i64 >= self.capacity as i64
    }

    /// Events at or before `now` are closed to new joins
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.event_date <= now
    }
}

/// Raw `events` row as stored in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub location: String,
    pub category: String,
    pub capacity: i32,
    pub image: Option<String>,
    pub creator_id: Uuid,
    pub attendees: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = String;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event {
            id: row.id,
            title: row.title,
            description: row.description,
            event_date: row.event_date,
            location: row.location,
            category: row.category.parse()?,
            capacity: row.capacity,
            image: row.image,
            creator_id: row.creator_id,
            attendees: row.attendees,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub location: String,
    #[serde(default)]
    pub category: Option<EventCategory>,
    pub capacity: i32,
    #[serde(default)]
    pub image: Option<String>,
}

/// Fields an event creator may change; `None` keeps the stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub category: Option<EventCategory>,
    pub capacity: Option<i32>,
    pub image: Option<String>,
}

/// A validated event ready to be persisted
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub location: String,
    pub category: EventCategory,
    pub capacity: i32,
    pub image: Option<String>,
    pub creator_id: Uuid,
}

/// Listing filter for the event query service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    pub search: Option<String>,
    pub category: Option<EventCategory>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl EventFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// Search term with surrounding whitespace removed; blank terms are ignored
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    /// Lower date bound. Without an explicit range only upcoming events are listed.
    pub fn lower_bound(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.start_date.is_some() || self.end_date.is_some() {
            self.start_date
        } else {
            Some(now)
        }
    }

    /// In-process equivalent of the SQL predicate used by the PostgreSQL store
    pub fn matches(&self, event: &Event, now: DateTime<Utc>) -> bool {
        if let Some(lower) = self.lower_bound(now) {
            if event.event_date < lower {
                return false;
            }
        }
        if let Some(upper) = self.end_date {
            if event.event_date > upper {
                return false;
            }
        }
        if let Some(category) = self.category {
            if event.category != category {
                return false;
            }
        }
        if let Some(term) = self.search_term() {
            let term = term.to_lowercase();
            if !event.title.to_lowercase().contains(&term)
                && !event.description.to_lowercase().contains(&term)
            {
                return false;
            }
        }
        true
    }
}

/// Events a user created and events they attend without having created them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyEvents {
    pub created: Vec<Event>,
    pub attending: Vec<Event>,
}

/// Requested RSVP action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsvpAction {
    Join,
    Leave,
}

impl fmt::Display for RsvpAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RsvpAction::Join => f.write_str("join"),
            RsvpAction::Leave => f.write_str("leave"),
        }
    }
}
