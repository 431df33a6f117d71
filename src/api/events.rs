//! Event endpoints

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ApiError;
use super::state::AppState;
use crate::middleware::AuthUser;
use crate::models::event::{
    CreateEventRequest, Event, EventCategory, EventFilter, UpdateEventRequest,
};

/// Query string accepted by `GET /api/events`
#[derive(Debug, Default, Deserialize)]
pub struct ListEventsQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    /// RFC 3339 timestamp or a plain `YYYY-MM-DD` date (start of that day)
    #[serde(alias = "startDate")]
    pub start_date: Option<String>,
    /// RFC 3339 timestamp or a plain `YYYY-MM-DD` date (end of that day)
    #[serde(alias = "endDate")]
    pub end_date: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TryFrom<ListEventsQuery> for EventFilter {
    type Error = ApiError;

    fn try_from(query: ListEventsQuery) -> Result<Self, Self::Error> {
        let category = query
            .category
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| value.parse::<EventCategory>())
            .transpose()
            .map_err(ApiError::bad_request)?;

        let start_date = query
            .start_date
            .as_deref()
            .map(|value| parse_date_bound("startDate", value, DayEdge::Start))
            .transpose()?
            .flatten();
        let end_date = query
            .end_date
            .as_deref()
            .map(|value| parse_date_bound("endDate", value, DayEdge::End))
            .transpose()?
            .flatten();

        Ok(EventFilter {
            search: query.search,
            category,
            start_date,
            end_date,
            limit: query.limit,
            offset: query.offset,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum DayEdge {
    Start,
    End,
}

/// Parse a date range bound; a bare date covers the whole day so both bounds
/// stay inclusive. Empty values mean no bound.
fn parse_date_bound(
    name: &str,
    value: &str,
    edge: DayEdge,
) -> Result<Option<DateTime<Utc>>, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(timestamp.with_timezone(&Utc)));
    }

    let invalid = || ApiError::bad_request(format!("Invalid {}: {}", name, value));
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
    let time: Option<NaiveDateTime> = match edge {
        DayEdge::Start => date.and_hms_opt(0, 0, 0),
        DayEdge::End => date.and_hms_nano_opt(23, 59, 59, 999_999_999),
    };

    time.map(|naive| Some(Utc.from_utc_datetime(&naive)))
        .ok_or_else(invalid)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let filter = EventFilter::try_from(query)?;
    let events = state.services.event_service.list(&filter, Utc::now()).await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Event>, ApiError> {
    let event = state.services.event_service.get(event_id).await?;
    Ok(Json(event))
}

pub async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    state.rate_limiter.check_rate_limit(user.user_id)?;

    let event = state
        .services
        .event_service
        .create(user.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<Uuid>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<Event>, ApiError> {
    state.rate_limiter.check_rate_limit(user.user_id)?;

    let event = state
        .services
        .event_service
        .update(event_id, user.user_id, request)
        .await?;
    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.rate_limiter.check_rate_limit(user.user_id)?;

    state
        .services
        .event_service
        .delete(event_id, user.user_id)
        .await?;
    Ok(Json(MessageResponse {
        message: "Event deleted successfully".to_string(),
    }))
}
