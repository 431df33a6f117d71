//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the EventHub application.

use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use uuid::Uuid;

use crate::config::LoggingConfig;
use crate::models::event::RsvpAction;
use crate::utils::errors::{AdmissionError, EventHubError, Result};

/// Target used for attendee invariant violations so alerting can key on it
pub const INVARIANT_TARGET: &str = "eventhub::invariant";

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer on drop and must be held for the
/// lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.level)
        .map_err(|e| EventHubError::Config(format!("Invalid log filter: {}", e)))?;

    let stdout_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stdout)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .boxed()
    };

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let file_appender = tracing_appender::rolling::daily(directory, "eventhub.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| EventHubError::Config(format!("Logging already initialized: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log the outcome of an RSVP decision
pub fn log_rsvp_decision(
    event_id: Uuid,
    user_id: Uuid,
    action: RsvpAction,
    outcome: std::result::Result<usize, &AdmissionError>,
) {
    match outcome {
        Ok(attendee_count) => info!(
            event_id = %event_id,
            user_id = %user_id,
            action = %action,
            attendee_count = attendee_count,
            "RSVP accepted"
        ),
        Err(reason) if reason.is_rejection() => info!(
            event_id = %event_id,
            user_id = %user_id,
            action = %action,
            reason = reason.code(),
            "RSVP rejected"
        ),
        Err(reason) => error!(
            event_id = %event_id,
            user_id = %user_id,
            action = %action,
            error = %reason,
            "RSVP failed"
        ),
    }
}

/// Log an attendee invariant violation. Always an alerting condition.
pub fn log_invariant_violation(event_id: Uuid, attendee_count: usize, capacity: i32, detail: &str) {
    error!(
        target: INVARIANT_TARGET,
        event_id = %event_id,
        attendee_count = attendee_count,
        capacity = capacity,
        detail = detail,
        "Attendee invariant violated"
    );
}

/// Log a retry of a transient store failure
pub fn log_store_retry(operation: &str, attempt: u32, delay_ms: u64, error: &str) {
    warn!(
        operation = operation,
        attempt = attempt,
        delay_ms = delay_ms,
        error = error,
        "Transient store failure, retrying"
    );
}

/// Log event management actions
pub fn log_event_action(event_id: Uuid, action: &str, user_id: Uuid, details: Option<&str>) {
    info!(
        event_id = %event_id,
        action = action,
        user_id = %user_id,
        details = details,
        "Event action performed"
    );
}

/// Log database operations
pub fn log_database_operation(operation: &str, table: &str, duration_ms: u64, success: bool) {
    if success {
        debug!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation completed"
        );
    } else {
        error!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation failed"
        );
    }
}
