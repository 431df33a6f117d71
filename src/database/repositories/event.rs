//! Event repository implementation

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::store::{EventCatalog, EventStore, JoinGuard};
use crate::models::event::{Event, EventFilter, EventRow, NewEvent, UpdateEventRequest};
use crate::utils::errors::{StoreError, StoreResult};
use crate::utils::logging::log_database_operation;

macro_rules! event_columns {
    () => {
        "id, title, description, event_date, location, category, capacity, image, creator_id, attendees, created_at, updated_at"
    };
}

/// PostgreSQL-backed event store.
///
/// Attendees live in a `UUID[]` column on the event row. Joins and leaves are
/// single `UPDATE ... WHERE <guard> RETURNING` statements: the row lock taken by
/// the update, plus the re-check of the WHERE clause against the newest row
/// version, makes each one atomic with respect to every other writer of that row.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn into_event(row: EventRow) -> StoreResult<Event> {
        let event_id = row.id;
        Event::try_from(row).map_err(|reason| StoreError::Corrupt { event_id, reason })
    }

    fn into_events(rows: Vec<EventRow>) -> StoreResult<Vec<Event>> {
        rows.into_iter().map(Self::into_event).collect()
    }

    fn observe<T>(operation: &str, started: Instant, result: &Result<T, sqlx::Error>) {
        log_database_operation(
            operation,
            "events",
            started.elapsed().as_millis() as u64,
            result.is_ok(),
        );
    }
}

/// Escape `%`, `_` and the escape character itself for use inside ILIKE
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl EventStore for EventRepository {
    async fn read_event(&self, event_id: Uuid) -> StoreResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events WHERE id = $1"
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::into_event).transpose()
    }

    async fn add_attendee_if(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        guard: JoinGuard,
    ) -> StoreResult<Option<Event>> {
        let started = Instant::now();
        let result = sqlx::query_as::<_, EventRow>(concat!(
            r#"
            UPDATE events
            SET attendees = array_append(attendees, $2),
                updated_at = NOW()
            WHERE id = $1
              AND event_date > $3
              AND cardinality(attendees) < capacity
              AND NOT ($2 = ANY(attendees))
            RETURNING "#,
            event_columns!()
        ))
        .bind(event_id)
        .bind(user_id)
        .bind(guard.now)
        .fetch_optional(&self.pool)
        .await;
        Self::observe("add_attendee_if", started, &result);

        result?.map(Self::into_event).transpose()
    }

    async fn remove_attendee_if_member(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Event>> {
        let started = Instant::now();
        let result = sqlx::query_as::<_, EventRow>(concat!(
            r#"
            UPDATE events
            SET attendees = array_remove(attendees, $2),
                updated_at = NOW()
            WHERE id = $1
              AND $2 = ANY(attendees)
            RETURNING "#,
            event_columns!()
        ))
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        Self::observe("remove_attendee_if_member", started, &result);

        result?.map(Self::into_event).transpose()
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl EventCatalog for EventRepository {
    async fn insert(&self, event: NewEvent) -> StoreResult<Event> {
        let row = sqlx::query_as::<_, EventRow>(concat!(
            r#"
            INSERT INTO events (id, title, description, event_date, location, category, capacity, image, creator_id, attendees, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, '{}', $10, $10)
            RETURNING "#,
            event_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(event.title)
        .bind(event.description)
        .bind(event.event_date)
        .bind(event.location)
        .bind(event.category.as_str())
        .bind(event.capacity)
        .bind(event.image)
        .bind(event.creator_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Self::into_event(row)
    }

    async fn update_if_creator(
        &self,
        event_id: Uuid,
        editor_id: Uuid,
        changes: UpdateEventRequest,
    ) -> StoreResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(concat!(
            r#"
            UPDATE events
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                event_date = COALESCE($5, event_date),
                location = COALESCE($6, location),
                category = COALESCE($7, category),
                capacity = COALESCE($8, capacity),
                image = COALESCE($9, image),
                updated_at = NOW()
            WHERE id = $1
              AND creator_id = $2
              AND cardinality(attendees) <= COALESCE($8, capacity)
            RETURNING "#,
            event_columns!()
        ))
        .bind(event_id)
        .bind(editor_id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.event_date)
        .bind(changes.location)
        .bind(changes.category.map(|category| category.as_str()))
        .bind(changes.capacity)
        .bind(changes.image)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::into_event).transpose()
    }

    async fn delete_if_creator(&self, event_id: Uuid, requester_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1 AND creator_id = $2")
            .bind(event_id)
            .bind(requester_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &EventFilter, now: DateTime<Utc>) -> StoreResult<Vec<Event>> {
        let mut query: QueryBuilder<'_, Postgres> = QueryBuilder::new(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events WHERE TRUE"
        ));

        if let Some(lower) = filter.lower_bound(now) {
            query.push(" AND event_date >= ").push_bind(lower);
        }
        if let Some(upper) = filter.end_date {
            query.push(" AND event_date <= ").push_bind(upper);
        }
        if let Some(category) = filter.category {
            query.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some(term) = filter.search_term() {
            let pattern = format!("%{}%", escape_like(term));
            query
                .push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        query
            .push(" ORDER BY event_date ASC, id ASC LIMIT ")
            .push_bind(filter.effective_limit())
            .push(" OFFSET ")
            .push_bind(filter.effective_offset());

        let rows = query
            .build_query_as::<EventRow>()
            .fetch_all(&self.pool)
            .await?;

        Self::into_events(rows)
    }

    async fn created_by(&self, user_id: Uuid) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events WHERE creator_id = $1 ORDER BY event_date ASC, id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Self::into_events(rows)
    }

    async fn attending(&self, user_id: Uuid) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events WHERE $1 = ANY(attendees) AND creator_id <> $1 ORDER BY event_date ASC, id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Self::into_events(rows)
    }
}
