//! Flashcard deck domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bindery_core::{BookId, DeckId, UserId};

/// A generated study deck tied to a purchased book.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FlashcardDeck {
    pub id: DeckId,
    pub user_id: UserId,
    /// Source book; `None` if the book was later deleted.
    pub book_id: Option<BookId>,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// One front/back card inside a deck.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Flashcard {
    pub id: i32,
    pub deck_id: DeckId,
    pub front: String,
    pub back: String,
    pub position: i32,
}
