//! Error handling for EventHub
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Main error type for EventHub application
#[derive(Error, Debug)]
pub enum EventHubError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Event store error: {0}")]
    Store(#[from] StoreError),

    #[error("RSVP rejected: {0}")]
    Admission(#[from] AdmissionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: Uuid },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Failures reported by an event store backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store operation timed out")]
    Timeout,

    #[error("store temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt event record {event_id}: {reason}")]
    Corrupt { event_id: Uuid, reason: String },

    #[error("store operation failed: {0}")]
    Failed(String),
}

impl StoreError {
    /// Transient failures may be retried; the operation was either not applied
    /// or re-applying it is guarded by the store-side predicates
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Timeout | StoreError::Unavailable(_))
    }
}

/// PostgreSQL SQLSTATE codes that indicate a retryable conflict
const RETRYABLE_SQLSTATES: [&str; 4] = [
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "57P01", // admin_shutdown
    "08006", // connection_failure
];

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            sqlx::Error::PoolClosed => StoreError::Unavailable("connection pool closed".to_string()),
            sqlx::Error::Io(e) => StoreError::Unavailable(e.to_string()),
            sqlx::Error::WorkerCrashed => StoreError::Unavailable("database worker crashed".to_string()),
            sqlx::Error::Database(db) => {
                let retryable = db
                    .code()
                    .map(|code| RETRYABLE_SQLSTATES.iter().any(|state| *state == code))
                    .unwrap_or(false);
                if retryable {
                    StoreError::Unavailable(db.to_string())
                } else {
                    StoreError::Failed(db.to_string())
                }
            }
            other => StoreError::Failed(other.to_string()),
        }
    }
}

/// Outcome of an RSVP admission decision that did not succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("event {event_id} not found")]
    NotFound { event_id: Uuid },

    #[error("event {event_id} started at {event_date} and is closed to new RSVPs")]
    EventExpired { event_id: Uuid, event_date: DateTime<Utc> },

    #[error("user {user_id} already joined event {event_id}")]
    AlreadyJoined { event_id: Uuid, user_id: Uuid },

    #[error("event {event_id} is at full capacity ({capacity})")]
    CapacityExceeded { event_id: Uuid, capacity: i32 },

    #[error("user {user_id} has not joined event {event_id}")]
    NotJoined { event_id: Uuid, user_id: Uuid },

    #[error("attendee invariant violated for event {event_id}: {detail}")]
    InvariantViolation { event_id: Uuid, detail: String },

    #[error("event {event_id} stayed contended after {attempts} conditional writes")]
    Contended { event_id: Uuid, attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdmissionError {
    /// Stable machine-readable code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            AdmissionError::NotFound { .. } => "event_not_found",
            AdmissionError::EventExpired { .. } => "event_expired",
            AdmissionError::AlreadyJoined { .. } => "already_joined",
            AdmissionError::CapacityExceeded { .. } => "event_full",
            AdmissionError::NotJoined { .. } => "not_joined",
            AdmissionError::InvariantViolation { .. } => "invariant_violation",
            AdmissionError::Contended { .. } | AdmissionError::Store(_) => "service_unavailable",
        }
    }

    /// Message shown to the requesting user
    pub fn user_message(&self) -> &'static str {
        match self {
            AdmissionError::NotFound { .. } => "Event not found",
            AdmissionError::EventExpired { .. } => "Cannot RSVP to past events",
            AdmissionError::AlreadyJoined { .. } => "You have already RSVP'd to this event",
            AdmissionError::CapacityExceeded { .. } => "Event is at full capacity",
            AdmissionError::NotJoined { .. } => "You have not RSVP'd to this event",
            AdmissionError::InvariantViolation { .. } => "Internal consistency error",
            AdmissionError::Contended { .. } | AdmissionError::Store(_) => {
                "Unable to RSVP right now. Please try again."
            }
        }
    }

    /// Business-rule and state-conflict rejections, as opposed to failures
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AdmissionError::NotFound { .. }
                | AdmissionError::EventExpired { .. }
                | AdmissionError::AlreadyJoined { .. }
                | AdmissionError::CapacityExceeded { .. }
                | AdmissionError::NotJoined { .. }
        )
    }
}

/// Result type alias for EventHub operations
pub type Result<T> = std::result::Result<T, EventHubError>;

/// Result type alias for event store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for admission decisions
pub type AdmissionResult<T> = std::result::Result<T, AdmissionError>;

impl EventHubError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            EventHubError::Database(_) => false,
            EventHubError::Migration(_) => false,
            EventHubError::Store(e) => e.is_transient(),
            EventHubError::Admission(AdmissionError::Store(e)) => e.is_transient(),
            EventHubError::Admission(AdmissionError::Contended { .. }) => true,
            EventHubError::Admission(_) => false,
            EventHubError::Config(_) => false,
            EventHubError::ConfigLoad(_) => false,
            EventHubError::PermissionDenied(_) => false,
            EventHubError::EventNotFound { .. } => false,
            EventHubError::Serialization(_) => false,
            EventHubError::Io(_) => true,
            EventHubError::Authentication(_) => false,
            EventHubError::RateLimitExceeded => true,
            EventHubError::InvalidInput(_) => false,
            EventHubError::ServiceUnavailable(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EventHubError::Database(_) => ErrorSeverity::Critical,
            EventHubError::Migration(_) => ErrorSeverity::Critical,
            EventHubError::Config(_) => ErrorSeverity::Critical,
            EventHubError::ConfigLoad(_) => ErrorSeverity::Critical,
            EventHubError::Admission(AdmissionError::InvariantViolation { .. }) => ErrorSeverity::Critical,
            EventHubError::Admission(e) if e.is_rejection() => ErrorSeverity::Info,
            EventHubError::PermissionDenied(_) => ErrorSeverity::Warning,
            EventHubError::Authentication(_) => ErrorSeverity::Warning,
            EventHubError::RateLimitExceeded => ErrorSeverity::Warning,
            EventHubError::InvalidInput(_) => ErrorSeverity::Info,
            EventHubError::EventNotFound { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
