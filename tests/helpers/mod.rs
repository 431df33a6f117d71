//! Test helpers module
//!
//! Fixtures, settings and scripted event stores shared by the integration tests.

#![allow(dead_code)]

pub mod database;
pub mod stores;

pub use database::*;
pub use stores::*;

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use uuid::Uuid;

use EventHub::api::AppState;
use EventHub::config::{Settings, StoreBackend};
use EventHub::database::{DatabaseService, InMemoryEventStore};
use EventHub::middleware::Claims;
use EventHub::models::event::{Event, EventCategory};

pub const TEST_JWT_SECRET: &str = "test-secret-for-integration-tests";

/// Settings for tests: in-memory store, fast retries, rate limiting off
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.database.backend = StoreBackend::Memory;
    settings.auth.jwt_secret = TEST_JWT_SECRET.to_string();
    settings.admission.base_delay_ms = 1;
    settings.admission.max_delay_ms = 5;
    settings.rate_limit.enabled = false;
    settings
}

/// An upcoming event starting `starts_in` from now
pub fn sample_event(capacity: i32, starts_in: Duration) -> Event {
    let now = Utc::now();
    Event {
        id: Uuid::new_v4(),
        title: "Rust Meetup".to_string(),
        description: "Lightning talks and pizza".to_string(),
        event_date: now + starts_in,
        location: "Main Hall".to_string(),
        category: EventCategory::Technology,
        capacity,
        image: None,
        creator_id: Uuid::new_v4(),
        attendees: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

pub fn upcoming_event(capacity: i32) -> Event {
    sample_event(capacity, Duration::days(7))
}

/// In-memory store pre-loaded with `events`
pub fn seeded_store(events: Vec<Event>) -> Arc<InMemoryEventStore> {
    let store = Arc::new(InMemoryEventStore::new());
    for event in events {
        store.put(event).expect("seed event");
    }
    store
}

/// Application state over a seeded in-memory store
pub fn test_state(settings: &Settings, store: Arc<InMemoryEventStore>) -> AppState {
    AppState::new(DatabaseService::from_backend(store), settings)
}

/// Sign a token the way the identity provider would
pub fn sign_token(user_id: Uuid, ttl: Duration) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("sign test token")
}

/// `Authorization` header value for `user_id`
pub fn bearer_for(user_id: Uuid) -> String {
    format!("Bearer {}", sign_token(user_id, Duration::hours(1)))
}
