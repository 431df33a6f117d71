//! RSVP admission control
//!
//! Decides whether a user may join or leave an event and applies the decision
//! against the event store. Correctness under concurrent requests comes from
//! the store's conditional mutations: a join is one guarded append that only
//! applies while the event is upcoming, has a free seat and does not already
//! list the user. The controller never holds a lock of its own; a read is only
//! issued after a conditional write matched nothing, to find out why.
//!
//! Per (event, user) pair the state machine is:
//!
//! ```text
//!                 join (upcoming, seat free)
//!  not_attending ───────────────────────────▶ attending
//!        ▲                                        │
//!        └────────────────── leave ───────────────┘
//! ```
//!
//! Every other (state, action) combination is a typed rejection.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::AdmissionConfig;
use crate::database::store::{JoinGuard, SharedEventStore};
use crate::models::event::{Event, EventSnapshot, RsvpAction};
use crate::services::retry::RetryPolicy;
use crate::utils::errors::{AdmissionError, AdmissionResult};
use crate::utils::logging::{log_invariant_violation, log_rsvp_decision};

/// Decide a join against a snapshot of the event.
///
/// Reasons are checked in a fixed order so the most fundamental one wins:
/// missing, then started, then already joined, then full.
pub fn evaluate_join(
    event: Option<&Event>,
    event_id: Uuid,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> AdmissionResult<()> {
    let event = event.ok_or(AdmissionError::NotFound { event_id })?;

    if event.has_started(now) {
        return Err(AdmissionError::EventExpired {
            event_id,
            event_date: event.event_date,
        });
    }
    if event.is_attending(user_id) {
        return Err(AdmissionError::AlreadyJoined { event_id, user_id });
    }
    if event.is_full() {
        return Err(AdmissionError::CapacityExceeded {
            event_id,
            capacity: event.capacity,
        });
    }

    Ok(())
}

/// Decide a leave against a snapshot of the event
pub fn evaluate_leave(event: Option<&Event>, event_id: Uuid, user_id: Uuid) -> AdmissionResult<()> {
    let event = event.ok_or(AdmissionError::NotFound { event_id })?;

    if !event.is_attending(user_id) {
        return Err(AdmissionError::NotJoined { event_id, user_id });
    }

    Ok(())
}

/// Check capacity and uniqueness of the attendee set
pub fn check_invariants(event: &Event) -> Result<(), String> {
    if event.attendees.len() as i64 > event.capacity as i64 {
        return Err(format!(
            "{} attendees exceed capacity {}",
            event.attendees.len(),
            event.capacity
        ));
    }

    let mut seen = HashSet::with_capacity(event.attendees.len());
    if let Some(duplicate) = event.attendees.iter().find(|id| !seen.insert(**id)) {
        return Err(format!("attendee {} listed more than once", duplicate));
    }

    Ok(())
}

#[derive(Clone)]
pub struct AdmissionController {
    store: SharedEventStore,
    retry: RetryPolicy,
    max_contention_retries: u32,
    verify_invariants: bool,
}

impl AdmissionController {
    pub fn new(store: SharedEventStore, config: &AdmissionConfig) -> Self {
        Self {
            store,
            retry: RetryPolicy::from_config(config),
            max_contention_retries: config.max_contention_retries,
            verify_invariants: config.verify_invariants,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Add `user_id` to the attendees of `event_id`
    #[instrument(skip(self))]
    pub async fn join(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AdmissionResult<EventSnapshot> {
        let result = self.try_join(event_id, user_id, now).await;
        log_rsvp_decision(
            event_id,
            user_id,
            RsvpAction::Join,
            result.as_ref().map(Event::attendee_count),
        );
        result
    }

    /// Remove `user_id` from the attendees of `event_id`
    #[instrument(skip(self))]
    pub async fn leave(&self, event_id: Uuid, user_id: Uuid) -> AdmissionResult<EventSnapshot> {
        let result = self.try_leave(event_id, user_id).await;
        log_rsvp_decision(
            event_id,
            user_id,
            RsvpAction::Leave,
            result.as_ref().map(Event::attendee_count),
        );
        result
    }

    async fn try_join(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AdmissionResult<EventSnapshot> {
        let guard = JoinGuard::new(now);
        let mut attempts = 0;

        loop {
            attempts += 1;
            let applied = self
                .retry
                .run("add_attendee_if", || {
                    self.store.add_attendee_if(event_id, user_id, guard)
                })
                .await?;

            if let Some(snapshot) = applied {
                return self.verified(snapshot, user_id);
            }

            // The guarded append matched nothing; read only to name the reason.
            let current = self.read(event_id).await?;
            evaluate_join(current.as_ref(), event_id, user_id, now)?;

            // Every predicate holds again, so a seat was freed after the write.
            if attempts > self.max_contention_retries {
                return Err(AdmissionError::Contended { event_id, attempts });
            }
            debug!(%event_id, %user_id, attempts, "Join lost a race, retrying conditional write");
        }
    }

    async fn try_leave(&self, event_id: Uuid, user_id: Uuid) -> AdmissionResult<EventSnapshot> {
        let mut attempts = 0;

        loop {
            attempts += 1;
            let removed = self
                .retry
                .run("remove_attendee_if_member", || {
                    self.store.remove_attendee_if_member(event_id, user_id)
                })
                .await?;

            if let Some(snapshot) = removed {
                return Ok(snapshot);
            }

            let current = self.read(event_id).await?;
            evaluate_leave(current.as_ref(), event_id, user_id)?;

            // The user re-joined between the failed removal and the read.
            if attempts > self.max_contention_retries {
                return Err(AdmissionError::Contended { event_id, attempts });
            }
            debug!(%event_id, %user_id, attempts, "Leave lost a race, retrying removal");
        }
    }

    async fn read(&self, event_id: Uuid) -> AdmissionResult<Option<Event>> {
        let event = self
            .retry
            .run("read_event", || self.store.read_event(event_id))
            .await?;
        Ok(event)
    }

    /// Tripwire on the snapshot returned by a successful append. A failure here
    /// means the store's conditional write is not atomic.
    fn verified(&self, snapshot: EventSnapshot, user_id: Uuid) -> AdmissionResult<EventSnapshot> {
        if !self.verify_invariants {
            return Ok(snapshot);
        }

        let check = check_invariants(&snapshot).and_then(|()| {
            if snapshot.is_attending(user_id) {
                Ok(())
            } else {
                Err(format!("joined user {} missing from returned attendees", user_id))
            }
        });

        match check {
            Ok(()) => Ok(snapshot),
            Err(detail) => {
                log_invariant_violation(
                    snapshot.id,
                    snapshot.attendee_count(),
                    snapshot.capacity,
                    &detail,
                );
                Err(AdmissionError::InvariantViolation {
                    event_id: snapshot.id,
                    detail,
                })
            }
        }
    }
}
