//! Application-level error handling.
//!
//! Every layer's error funnels into [`AppError`], which maps to an HTTP
//! status plus the standard JSON envelope (`success`, `message`, `error`).
//! Internal detail is only echoed outside production; server-side failures
//! are logged and reported to Sentry either way.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::flashcards::FlashcardError;
use crate::services::media::MediaError;
use crate::services::payments::PaymentError;

/// Whether the server runs in production. Set once at startup; controls
/// whether error detail leaks into responses.
static PRODUCTION: AtomicBool = AtomicBool::new(false);

/// Record the deployment environment for error rendering.
pub fn set_production(value: bool) {
    PRODUCTION.store(value, Ordering::Relaxed);
}

fn is_production() -> bool {
    PRODUCTION.load(Ordering::Relaxed)
}

/// Top-level error for request handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Flashcards(#[from] FlashcardError),

    /// Request was well-formed but semantically invalid.
    #[error("{0}")]
    Validation(String),

    /// The addressed resource does not exist (or is not the caller's).
    #[error("{0}")]
    NotFound(String),

    /// Authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),

    /// A feature whose configuration is absent.
    #[error("{0}")]
    Disabled(String),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status plus the client-safe message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Repository(e) => match e {
                RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_owned()),
                RepositoryError::Conflict(message) => (StatusCode::BAD_REQUEST, message.clone()),
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_owned())
                }
            },
            Self::Auth(e) => match e {
                AuthError::InvalidCredentials | AuthError::TokenInvalid => {
                    (StatusCode::UNAUTHORIZED, e.to_string())
                }
                AuthError::OAuthDisabled => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
                AuthError::OAuthExchange(_) | AuthError::Http(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "OAuth provider error".to_owned(),
                ),
                AuthError::TokenCreation(_) | AuthError::Hash(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Authentication error".to_owned(),
                ),
            },
            Self::Media(e) => match e {
                MediaError::InvalidAssetUrl(_) | MediaError::UploadRejected(_) => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                MediaError::AssetUnavailable { .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Asset is currently unavailable".to_owned(),
                ),
                MediaError::Http(_) | MediaError::UpstreamStatus { .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Upstream media error".to_owned(),
                ),
                MediaError::Io(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Media storage error".to_owned(),
                ),
            },
            Self::Payment(e) => match e {
                PaymentError::EmptyCart | PaymentError::InvalidAmount { .. } => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                PaymentError::Api { .. } | PaymentError::Http(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Payment provider error".to_owned(),
                ),
            },
            Self::Flashcards(e) => match e {
                FlashcardError::Api { .. }
                | FlashcardError::Http(_)
                | FlashcardError::MalformedOutput(_)
                | FlashcardError::EmptyDeck => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Flashcard generation failed".to_owned(),
                ),
            },
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, message.clone()),
            Self::Disabled(message) => (StatusCode::SERVICE_UNAVAILABLE, message.clone()),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_owned(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let detail = self.to_string();

        if status.is_server_error() {
            error!(status = status.as_u16(), %detail, "request failed");
            sentry::capture_message(&detail, sentry::Level::Error);
        } else if status == StatusCode::UNAUTHORIZED {
            warn!(%detail, "rejected credentials");
        }

        let error_field = if status.is_success() || is_production() {
            None
        } else {
            Some(detail)
        };

        let body = json!({
            "success": false,
            "message": message,
            "error": error_field,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let (status, message) = AppError::NotFound("Book not found".to_owned()).status_and_message();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(message, "Book not found");
    }

    #[test]
    fn conflict_maps_to_400_with_repository_message() {
        let err = AppError::Repository(RepositoryError::Conflict(
            "Username already exists".to_owned(),
        ));
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Username already exists");
    }

    #[test]
    fn credentials_map_to_401() {
        let (status, _) = AppError::Auth(AuthError::InvalidCredentials).status_and_message();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn exhausted_retrieval_maps_to_500_without_attempt_detail() {
        let err = AppError::Media(MediaError::AssetUnavailable {
            attempts: vec!["https://internal.example/x: 404".to_owned()],
        });
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("internal.example"));
    }

    #[test]
    fn internal_message_is_not_echoed() {
        let err = AppError::Internal("pool exhausted at 10.0.0.3".to_owned());
        let (_, message) = err.status_and_message();
        assert_eq!(message, "Internal server error");
    }
}
