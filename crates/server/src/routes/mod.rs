//! HTTP route handlers.
//!
//! All handlers speak the JSON envelope (`success`, `message`, plus
//! endpoint-specific data fields); PDF and image endpoints answer with raw
//! bytes and a content type. Handlers return `Result<_, AppError>` and the
//! error type renders the failure envelope.

pub mod assets;
pub mod auth;
pub mod books;
pub mod cart;
pub mod chat;
pub mod checkout;
pub mod events;
pub mod flashcards;

use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Book PDFs come through multipart, so the body cap is well past the 2 MiB
/// default.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Assemble the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .nest("/api/auth", auth::router())
        .nest("/api/books", books::router())
        .nest("/api/cart", cart::router())
        .nest("/api/checkout", checkout::router())
        .route("/api/purchases", get(checkout::list_purchases))
        .nest("/api/events", events::router())
        .nest("/api/chat", chat::router())
        .nest("/api/flashcards", flashcards::router())
        .nest("/api/assets", assets::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness: the process is up.
async fn health() -> &'static str {
    "ok"
}

/// Readiness: the database answers.
async fn ready(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").execute(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
