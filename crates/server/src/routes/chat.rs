//! Chat history routes: the backend stores the conversation, nothing more.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::db::ChatRepository;
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::state::AppState;

const ROLES: &[&str] = &["user", "assistant"];
const MAX_CONTENT_LENGTH: usize = 16 * 1024;

pub fn router() -> Router<AppState> {
    Router::new().route("/messages", get(fetch).post(append).delete(clear))
}

#[derive(Debug, Deserialize)]
struct AppendRequest {
    #[serde(default = "default_role")]
    role: String,
    content: String,
}

fn default_role() -> String {
    "user".to_owned()
}

async fn fetch(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Value>, AppError> {
    let messages = ChatRepository::new(state.pool()).fetch(current.id()).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Chat history",
        "messages": messages,
    })))
}

async fn append(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<AppendRequest>,
) -> Result<Json<Value>, AppError> {
    if !ROLES.contains(&request.role.as_str()) {
        return Err(AppError::Validation(format!(
            "role must be one of: {}",
            ROLES.join(", ")
        )));
    }
    if request.content.trim().is_empty() {
        return Err(AppError::Validation("Message content is required".to_owned()));
    }
    if request.content.len() > MAX_CONTENT_LENGTH {
        return Err(AppError::Validation("Message is too long".to_owned()));
    }

    let stored = ChatRepository::new(state.pool())
        .append(current.id(), &request.role, &request.content)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Message stored",
        "chat_message": stored,
    })))
}

async fn clear(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Value>, AppError> {
    let removed = ChatRepository::new(state.pool()).clear(current.id()).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Chat history cleared",
        "removed": removed,
    })))
}
