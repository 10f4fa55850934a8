//! Calendar event routes. All rows are scoped to the authenticated user;
//! someone else's event behaves as missing.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use bindery_core::EventId;

use crate::db::EventRepository;
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::NewEvent;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", axum::routing::put(update).delete(delete))
}

#[derive(Debug, Default, Deserialize)]
struct RangeQuery {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Value>, AppError> {
    let events = EventRepository::new(state.pool())
        .list(current.id(), range.from, range.to)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Events",
        "events": events,
    })))
}

async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(event): Json<NewEvent>,
) -> Result<Json<Value>, AppError> {
    validate(&event)?;
    let created = EventRepository::new(state.pool())
        .create(current.id(), &event)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Event created",
        "event": created,
    })))
}

async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<EventId>,
    Json(event): Json<NewEvent>,
) -> Result<Json<Value>, AppError> {
    validate(&event)?;
    let updated = EventRepository::new(state.pool())
        .update(current.id(), id, &event)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Event updated",
        "event": updated,
    })))
}

async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<EventId>,
) -> Result<Json<Value>, AppError> {
    EventRepository::new(state.pool())
        .delete(current.id(), id)
        .await?;
    Ok(Json(json!({ "success": true, "message": "Event deleted" })))
}

fn validate(event: &NewEvent) -> Result<(), AppError> {
    if event.title.trim().is_empty() {
        return Err(AppError::Validation("Event title is required".to_owned()));
    }
    if let Some(ends_at) = event.ends_at
        && ends_at < event.starts_at
    {
        return Err(AppError::Validation(
            "Event cannot end before it starts".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(starts: &str, ends: Option<&str>) -> NewEvent {
        NewEvent {
            title: "Book club".to_owned(),
            description: String::new(),
            starts_at: starts.parse().unwrap_or_else(|_| Utc::now()),
            ends_at: ends.map(|e| e.parse().unwrap_or_else(|_| Utc::now())),
        }
    }

    #[test]
    fn rejects_inverted_range() {
        let bad = event("2026-03-02T10:00:00Z", Some("2026-03-01T10:00:00Z"));
        assert!(validate(&bad).is_err());
    }

    #[test]
    fn accepts_open_ended_events() {
        assert!(validate(&event("2026-03-02T10:00:00Z", None)).is_ok());
    }

    #[test]
    fn rejects_blank_title() {
        let mut bad = event("2026-03-02T10:00:00Z", None);
        bad.title = "  ".to_owned();
        assert!(validate(&bad).is_err());
    }
}
