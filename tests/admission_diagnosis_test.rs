//! Admission behavior against misbehaving stores
//!
//! Transient failures, lost acknowledgements, lost races and a store whose
//! conditional write is not atomic.

mod helpers;

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::Utc;
use uuid::Uuid;

use helpers::*;
use EventHub::config::AdmissionConfig;
use EventHub::database::EventStore;
use EventHub::services::AdmissionController;
use EventHub::{AdmissionError, StoreError};

fn admission_config() -> AdmissionConfig {
    test_settings().admission
}

/// Test that transient write failures are retried until the join lands
#[tokio::test]
async fn test_transient_failures_are_retried() {
    let event = upcoming_event(3);
    let event_id = event.id;
    let flaky = Arc::new(FlakyStore::new(seeded_store(vec![event]), 2, StoreError::Timeout));
    let controller = AdmissionController::new(flaky.clone(), &admission_config());
    let user = Uuid::new_v4();

    let snapshot = controller.join(event_id, user, Utc::now()).await.unwrap();

    assert_eq!(snapshot.attendees, vec![user]);
    assert_eq!(flaky.write_calls(), 3);
}

/// Test that retries are bounded and the store error surfaces
#[tokio::test]
async fn test_persistent_transient_failure_surfaces_store_error() {
    let event = upcoming_event(3);
    let event_id = event.id;
    let flaky = Arc::new(FlakyStore::new(
        seeded_store(vec![event]),
        100,
        StoreError::Unavailable("connection reset".to_string()),
    ));
    let config = admission_config();
    let controller = AdmissionController::new(flaky.clone(), &config);

    assert_matches!(
        controller.join(event_id, Uuid::new_v4(), Utc::now()).await,
        Err(AdmissionError::Store(StoreError::Unavailable(_)))
    );
    assert_eq!(flaky.write_calls(), config.max_store_attempts);
}

/// Test that permanent failures are not retried
#[tokio::test]
async fn test_permanent_failure_is_not_retried() {
    let event = upcoming_event(3);
    let event_id = event.id;
    let flaky = Arc::new(FlakyStore::new(
        seeded_store(vec![event]),
        1,
        StoreError::Failed("permission denied for table events".to_string()),
    ));
    let controller = AdmissionController::new(flaky.clone(), &admission_config());

    assert_matches!(
        controller.leave(event_id, Uuid::new_v4()).await,
        Err(AdmissionError::Store(StoreError::Failed(_)))
    );
    assert_eq!(flaky.write_calls(), 1);
}

/// Test that a join whose acknowledgement was lost reports AlreadyJoined on retry
#[tokio::test]
async fn test_lost_acknowledgement_reports_already_joined() {
    let event = upcoming_event(2);
    let event_id = event.id;
    let inner = seeded_store(vec![event]);
    let controller = AdmissionController::new(Arc::new(LostAckStore::new(inner.clone())), &admission_config());
    let user = Uuid::new_v4();

    assert_matches!(
        controller.join(event_id, user, Utc::now()).await,
        Err(AdmissionError::AlreadyJoined { .. })
    );

    let stored = inner.read_event(event_id).await.unwrap().unwrap();
    assert_eq!(stored.attendees, vec![user]);
}

/// Test that a lost race with an admissible re-read is retried
#[tokio::test]
async fn test_lost_race_is_retried() {
    let event = upcoming_event(2);
    let event_id = event.id;
    let config = admission_config();
    let racing = RacingStore::new(seeded_store(vec![event]), config.max_contention_retries);
    let controller = AdmissionController::new(Arc::new(racing), &config);

    let snapshot = controller.join(event_id, Uuid::new_v4(), Utc::now()).await.unwrap();
    assert_eq!(snapshot.attendee_count(), 1);
}

/// Test that persistent contention becomes a retryable error, not a wrong rejection
#[tokio::test]
async fn test_persistent_contention_is_reported() {
    let event = upcoming_event(2);
    let event_id = event.id;
    let config = admission_config();
    let racing = RacingStore::new(seeded_store(vec![event]), config.max_contention_retries + 1);
    let controller = AdmissionController::new(Arc::new(racing), &config);

    let result = controller.join(event_id, Uuid::new_v4(), Utc::now()).await;
    assert_matches!(result, Err(AdmissionError::Contended { attempts, .. }) if attempts == config.max_contention_retries + 1);
}

/// Test that a store overfilling an event trips the invariant check
#[tokio::test]
async fn test_overcommitting_store_trips_invariant() {
    let event = upcoming_event(1);
    let event_id = event.id;
    let inner = seeded_store(vec![event]);
    let controller = AdmissionController::new(
        Arc::new(OvercommitStore { inner: inner.clone() }),
        &admission_config(),
    );

    controller.join(event_id, Uuid::new_v4(), Utc::now()).await.unwrap();
    assert_matches!(
        controller.join(event_id, Uuid::new_v4(), Utc::now()).await,
        Err(AdmissionError::InvariantViolation { .. })
    );

    // No compensation: the store keeps what it committed
    assert_eq!(inner.read_event(event_id).await.unwrap().unwrap().attendee_count(), 2);
}

/// Test that duplicate attendees from a broken store are detected
#[tokio::test]
async fn test_duplicate_attendee_trips_invariant() {
    let event = upcoming_event(5);
    let event_id = event.id;
    let inner = seeded_store(vec![event]);
    let controller = AdmissionController::new(
        Arc::new(OvercommitStore { inner }),
        &admission_config(),
    );
    let user = Uuid::new_v4();

    controller.join(event_id, user, Utc::now()).await.unwrap();
    assert_matches!(
        controller.join(event_id, user, Utc::now()).await,
        Err(AdmissionError::InvariantViolation { detail, .. }) if detail.contains("more than once")
    );
}

/// Test that the tripwire can be switched off
#[tokio::test]
async fn test_invariant_check_can_be_disabled() {
    let event = upcoming_event(1);
    let event_id = event.id;
    let mut config = admission_config();
    config.verify_invariants = false;
    let controller = AdmissionController::new(
        Arc::new(OvercommitStore { inner: seeded_store(vec![event]) }),
        &config,
    );

    controller.join(event_id, Uuid::new_v4(), Utc::now()).await.unwrap();
    let overfilled = controller.join(event_id, Uuid::new_v4(), Utc::now()).await.unwrap();
    assert_eq!(overfilled.attendee_count(), 2);
}
