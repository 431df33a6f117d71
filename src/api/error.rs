//! HTTP error responses
//!
//! Maps application errors to a status code and a `{ "error", "message" }`
//! body. Internal details are logged, never returned to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::utils::errors::{AdmissionError, ErrorSeverity, EventHubError};

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    source: Option<EventHubError>,
}

/// Error body returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    fn with_source(mut self, source: EventHubError) -> Self {
        self.source = Some(source);
        self
    }
}

fn admission_status(error: &AdmissionError) -> StatusCode {
    match error {
        AdmissionError::NotFound { .. } => StatusCode::NOT_FOUND,
        AdmissionError::EventExpired { .. } => StatusCode::BAD_REQUEST,
        AdmissionError::AlreadyJoined { .. }
        | AdmissionError::CapacityExceeded { .. }
        | AdmissionError::NotJoined { .. } => StatusCode::CONFLICT,
        AdmissionError::InvariantViolation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        AdmissionError::Contended { .. } | AdmissionError::Store(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

fn store_unavailable() -> ApiError {
    ApiError::new(
        StatusCode::SERVICE_UNAVAILABLE,
        "service_unavailable",
        "Service temporarily unavailable. Please try again.",
    )
}

fn internal() -> ApiError {
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "Server error",
    )
}

impl From<AdmissionError> for ApiError {
    fn from(error: AdmissionError) -> Self {
        ApiError::new(admission_status(&error), error.code(), error.user_message())
            .with_source(EventHubError::Admission(error))
    }
}

impl From<EventHubError> for ApiError {
    fn from(error: EventHubError) -> Self {
        let response = match &error {
            EventHubError::Admission(admission) => {
                return ApiError::from(admission.clone());
            }
            EventHubError::EventNotFound { .. } => {
                ApiError::new(StatusCode::NOT_FOUND, "event_not_found", "Event not found")
            }
            EventHubError::PermissionDenied(message) => {
                ApiError::new(StatusCode::FORBIDDEN, "forbidden", message.clone())
            }
            EventHubError::InvalidInput(message) => ApiError::bad_request(message.clone()),
            EventHubError::Authentication(message) => {
                ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", message.clone())
            }
            EventHubError::RateLimitExceeded => ApiError::new(
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many requests. Please slow down.",
            ),
            EventHubError::Store(store) if store.is_transient() => store_unavailable(),
            EventHubError::ServiceUnavailable(_) => store_unavailable(),
            _ => internal(),
        };

        response.with_source(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Some(source) = &self.source {
            match source.severity() {
                ErrorSeverity::Critical | ErrorSeverity::Error => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    error = %source,
                    "Request failed"
                ),
                ErrorSeverity::Warning => tracing::warn!(
                    status = %self.status,
                    code = self.code,
                    error = %source,
                    "Request failed"
                ),
                ErrorSeverity::Info => tracing::debug!(
                    status = %self.status,
                    code = self.code,
                    error = %source,
                    "Request rejected"
                ),
            }
        }

        let body = ErrorBody {
            error: self.code.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
