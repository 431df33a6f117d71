//! RSVP endpoints
//!
//! Thin wrappers around the admission controller. Every rejection carries its
//! own status and message; see [`super::error`].

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ApiError;
use super::state::AppState;
use crate::middleware::AuthUser;
use crate::models::event::{EventSnapshot, MyEvents};

#[derive(Debug, Serialize, Deserialize)]
pub struct RsvpResponse {
    pub message: String,
    pub event: EventSnapshot,
}

pub async fn join_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Json<RsvpResponse>, ApiError> {
    state.rate_limiter.check_rate_limit(user.user_id)?;

    let event = state
        .services
        .admission
        .join(event_id, user.user_id, Utc::now())
        .await?;

    Ok(Json(RsvpResponse {
        message: "Successfully RSVP'd to event".to_string(),
        event,
    }))
}

pub async fn leave_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Json<RsvpResponse>, ApiError> {
    state.rate_limiter.check_rate_limit(user.user_id)?;

    let event = state.services.admission.leave(event_id, user.user_id).await?;

    Ok(Json(RsvpResponse {
        message: "RSVP cancelled successfully".to_string(),
        event,
    }))
}

pub async fn my_events(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<MyEvents>, ApiError> {
    let events = state.services.event_service.my_events(user.user_id).await?;
    Ok(Json(events))
}
