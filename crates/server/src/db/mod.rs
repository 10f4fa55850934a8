//! Database operations for the Bindery `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Local and OAuth accounts (cart and reset state hang off this)
//! - `books` - Catalog rows
//! - `cart_items` - One row per (user, book); mutations are single atomic statements
//! - `purchases` / `purchase_items` - Immutable checkout records
//! - `events` - Calendar events
//! - `chat_messages` - Chat history
//! - `flashcard_decks` / `flashcards` - AI-generated study decks
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p bindery-cli -- migrate
//! ```

pub mod books;
pub mod cart;
pub mod chat;
pub mod events;
pub mod flashcards;
pub mod purchases;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use books::BookRepository;
pub use cart::CartRepository;
pub use chat::ChatRepository;
pub use events::EventRepository;
pub use flashcards::FlashcardRepository;
pub use purchases::PurchaseRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique username).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a sqlx error, converting unique violations into `Conflict`.
pub(crate) fn map_unique_violation(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
