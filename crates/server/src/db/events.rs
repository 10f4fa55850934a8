//! Calendar event repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bindery_core::{EventId, UserId};

use super::RepositoryError;
use crate::models::{CalendarEvent, NewEvent};

const EVENT_COLUMNS: &str =
    "id, user_id, title, description, starts_at, ends_at, created_at";

/// Repository for calendar events. All queries are scoped by owner.
pub struct EventRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EventRepository<'a> {
    /// Create a new event repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the user's events, optionally bounded to a date range.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        user_id: UserId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<CalendarEvent>, RepositoryError> {
        let events = sqlx::query_as::<_, CalendarEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE user_id = $1
               AND ($2::timestamptz IS NULL OR starts_at >= $2)
               AND ($3::timestamptz IS NULL OR starts_at <= $3)
             ORDER BY starts_at"
        ))
        .bind(user_id.as_i32())
        .bind(from)
        .bind(to)
        .fetch_all(self.pool)
        .await?;
        Ok(events)
    }

    /// Create an event for the user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        event: &NewEvent,
    ) -> Result<CalendarEvent, RepositoryError> {
        let created = sqlx::query_as::<_, CalendarEvent>(&format!(
            "INSERT INTO events (user_id, title, description, starts_at, ends_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(user_id.as_i32())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .fetch_one(self.pool)
        .await?;
        Ok(created)
    }

    /// Update one of the user's events.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the event does not exist or
    /// belongs to another user.
    pub async fn update(
        &self,
        user_id: UserId,
        id: EventId,
        event: &NewEvent,
    ) -> Result<CalendarEvent, RepositoryError> {
        let updated = sqlx::query_as::<_, CalendarEvent>(&format!(
            "UPDATE events
             SET title = $3, description = $4, starts_at = $5, ends_at = $6
             WHERE id = $2 AND user_id = $1
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(user_id.as_i32())
        .bind(id.as_i32())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        Ok(updated)
    }

    /// Delete one of the user's events.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the event does not exist or
    /// belongs to another user.
    pub async fn delete(&self, user_id: UserId, id: EventId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $2 AND user_id = $1")
            .bind(user_id.as_i32())
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
