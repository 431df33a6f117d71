//! Concurrency tests for RSVP admission
//!
//! Many tasks race joins and leaves against the same event on a multi-threaded
//! runtime; the attendee set must stay within capacity and free of duplicates.

mod helpers;

use std::collections::HashSet;
use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::Utc;
use futures::future::join_all;
use proptest::prelude::*;
use uuid::Uuid;

use helpers::*;
use EventHub::database::EventStore;
use EventHub::services::admission::check_invariants;
use EventHub::services::AdmissionController;
use EventHub::AdmissionError;

fn controller(store: Arc<EventHub::database::InMemoryEventStore>) -> AdmissionController {
    AdmissionController::new(store, &test_settings().admission)
}

/// Test that N concurrent joins on capacity C admit exactly C users
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_joins_fill_exactly_to_capacity() {
    const CAPACITY: i32 = 10;
    const CONTENDERS: usize = 200;

    let event = upcoming_event(CAPACITY);
    let event_id = event.id;
    let store = seeded_store(vec![event]);
    let controller = controller(store.clone());

    let tasks = (0..CONTENDERS).map(|_| {
        let controller = controller.clone();
        let user_id = Uuid::new_v4();
        tokio::spawn(async move { (user_id, controller.join(event_id, user_id, Utc::now()).await) })
    });

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("join task panicked"))
        .collect();

    let admitted: HashSet<Uuid> = results
        .iter()
        .filter(|(_, result)| result.is_ok())
        .map(|(user_id, _)| *user_id)
        .collect();
    let rejected = results
        .iter()
        .filter(|(_, result)| matches!(result, Err(AdmissionError::CapacityExceeded { .. })))
        .count();

    assert_eq!(admitted.len(), CAPACITY as usize);
    assert_eq!(rejected, CONTENDERS - CAPACITY as usize);

    let stored = store.read_event(event_id).await.unwrap().unwrap();
    assert_eq!(stored.attendees.len(), CAPACITY as usize);
    assert_eq!(stored.attendees.iter().copied().collect::<HashSet<_>>(), admitted);
    assert!(check_invariants(&stored).is_ok());
}

/// Test that one user hammering join is admitted once
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_joins_admit_once() {
    let event = upcoming_event(50);
    let event_id = event.id;
    let store = seeded_store(vec![event]);
    let controller = controller(store.clone());
    let user_id = Uuid::new_v4();

    let tasks = (0..32).map(|_| {
        let controller = controller.clone();
        tokio::spawn(async move { controller.join(event_id, user_id, Utc::now()).await })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(Result::unwrap).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(AdmissionError::AlreadyJoined { .. }))));

    let stored = store.read_event(event_id).await.unwrap().unwrap();
    assert_eq!(stored.attendees, vec![user_id]);
}

/// Test that concurrent leaves by the same user remove them once
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_leaves_remove_once() {
    let user_id = Uuid::new_v4();
    let mut event = upcoming_event(3);
    event.attendees = vec![user_id];
    let event_id = event.id;
    let controller = controller(seeded_store(vec![event]));

    let tasks = (0..16).map(|_| {
        let controller = controller.clone();
        tokio::spawn(async move { controller.leave(event_id, user_id).await })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(Result::unwrap).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, AdmissionError::NotJoined { .. })));
}

/// Test that joins and leaves interleaved across tasks keep the invariants
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_mixed_joins_and_leaves_stay_within_capacity() {
    const CAPACITY: i32 = 5;

    let event = upcoming_event(CAPACITY);
    let event_id = event.id;
    let store = seeded_store(vec![event]);
    let controller = controller(store.clone());

    let tasks = (0..40).map(|_| {
        let controller = controller.clone();
        let store = store.clone();
        let user_id = Uuid::new_v4();
        tokio::spawn(async move {
            for _ in 0..10 {
                if controller.join(event_id, user_id, Utc::now()).await.is_ok() {
                    let snapshot = store.read_event(event_id).await.unwrap().unwrap();
                    assert!(snapshot.attendees.len() <= CAPACITY as usize);
                    tokio::task::yield_now().await;
                    controller.leave(event_id, user_id).await.unwrap();
                }
            }
        })
    });

    for task in join_all(tasks).await {
        task.expect("worker panicked");
    }

    let stored = store.read_event(event_id).await.unwrap().unwrap();
    assert!(stored.attendees.is_empty());
}

/// Test that events do not interfere with each other under load
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_events_fill_independently() {
    let events: Vec<_> = (1..=4).map(upcoming_event).collect();
    let ids: Vec<_> = events.iter().map(|event| (event.id, event.capacity)).collect();
    let store = seeded_store(events);
    let controller = controller(store.clone());

    let tasks = ids.iter().flat_map(|&(event_id, _)| {
        let controller = controller.clone();
        (0..20).map(move |_| {
            let controller = controller.clone();
            tokio::spawn(async move { controller.join(event_id, Uuid::new_v4(), Utc::now()).await })
        })
    });
    join_all(tasks).await;

    for (event_id, capacity) in ids {
        let stored = store.read_event(event_id).await.unwrap().unwrap();
        assert_eq!(stored.attendees.len(), capacity as usize);
    }
}

/// Test the capacity-one scenario end to end
#[tokio::test]
async fn test_last_seat_is_released_on_leave() {
    let event = upcoming_event(1);
    let event_id = event.id;
    let controller = controller(seeded_store(vec![event]));
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    controller.join(event_id, alice, Utc::now()).await.unwrap();
    assert_matches!(
        controller.join(event_id, bob, Utc::now()).await,
        Err(AdmissionError::CapacityExceeded { capacity: 1, .. })
    );
    assert_eq!(controller.leave(event_id, alice).await.unwrap().attendee_count(), 0);
    assert_eq!(controller.join(event_id, bob, Utc::now()).await.unwrap().attendees, vec![bob]);
}

#[derive(Debug, Clone)]
enum Step {
    Join(usize),
    Leave(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0..6usize).prop_map(Step::Join),
        (0..6usize).prop_map(Step::Leave),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any sequence of joins and leaves matches a set model and keeps the invariants
    #[test]
    fn prop_sequences_preserve_invariants(capacity in 1..5i32, steps in prop::collection::vec(step(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        runtime.block_on(async {
            let event = upcoming_event(capacity);
            let event_id = event.id;
            let store = seeded_store(vec![event]);
            let controller = controller(store.clone());
            let users: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();
            let mut model: Vec<Uuid> = Vec::new();

            for step in steps {
                match step {
                    Step::Join(i) => {
                        let user = users[i];
                        let result = controller.join(event_id, user, Utc::now()).await;
                        if model.contains(&user) {
                            prop_assert!(matches!(result, Err(AdmissionError::AlreadyJoined { .. })), "expected AlreadyJoined, got {:?}", result);
                        } else if model.len() >= capacity as usize {
                            prop_assert!(matches!(result, Err(AdmissionError::CapacityExceeded { .. })), "expected CapacityExceeded, got {:?}", result);
                        } else {
                            prop_assert!(result.is_ok());
                            model.push(user);
                        }
                    }
                    Step::Leave(i) => {
                        let user = users[i];
                        let result = controller.leave(event_id, user).await;
                        if model.contains(&user) {
                            prop_assert!(result.is_ok());
                            model.retain(|member| *member != user);
                        } else {
                            prop_assert!(matches!(result, Err(AdmissionError::NotJoined { .. })), "expected NotJoined, got {:?}", result);
                        }
                    }
                }

                let stored = store.read_event(event_id).await.unwrap().unwrap();
                prop_assert!(check_invariants(&stored).is_ok());
                prop_assert_eq!(&stored.attendees, &model);
            }
            Ok(())
        })?;
    }
}
