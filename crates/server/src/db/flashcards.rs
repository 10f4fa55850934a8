//! Flashcard deck repository.

use sqlx::PgPool;

use bindery_core::{BookId, DeckId, UserId};

use super::RepositoryError;
use crate::models::{Flashcard, FlashcardDeck};

const DECK_COLUMNS: &str = "id, user_id, book_id, title, created_at";
const CARD_COLUMNS: &str = "id, deck_id, front, back, position";

/// Repository for flashcard decks. All queries are scoped by owner.
pub struct FlashcardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FlashcardRepository<'a> {
    /// Create a new flashcard repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the user's decks, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_decks(&self, user_id: UserId) -> Result<Vec<FlashcardDeck>, RepositoryError> {
        let decks = sqlx::query_as::<_, FlashcardDeck>(&format!(
            "SELECT {DECK_COLUMNS} FROM flashcard_decks
             WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;
        Ok(decks)
    }

    /// Fetch one of the user's decks.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_deck(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Option<FlashcardDeck>, RepositoryError> {
        let deck = sqlx::query_as::<_, FlashcardDeck>(&format!(
            "SELECT {DECK_COLUMNS} FROM flashcard_decks WHERE id = $2 AND user_id = $1"
        ))
        .bind(user_id.as_i32())
        .bind(deck_id.as_i32())
        .fetch_optional(self.pool)
        .await?;
        Ok(deck)
    }

    /// Fetch a deck's cards in position order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn cards(&self, deck_id: DeckId) -> Result<Vec<Flashcard>, RepositoryError> {
        let cards = sqlx::query_as::<_, Flashcard>(&format!(
            "SELECT {CARD_COLUMNS} FROM flashcards WHERE deck_id = $1 ORDER BY position, id"
        ))
        .bind(deck_id.as_i32())
        .fetch_all(self.pool)
        .await?;
        Ok(cards)
    }

    /// Persist a generated deck and its cards in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails.
    pub async fn create_deck(
        &self,
        user_id: UserId,
        book_id: BookId,
        title: &str,
        cards: &[(String, String)],
    ) -> Result<FlashcardDeck, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let deck = sqlx::query_as::<_, FlashcardDeck>(&format!(
            "INSERT INTO flashcard_decks (user_id, book_id, title)
             VALUES ($1, $2, $3)
             RETURNING {DECK_COLUMNS}"
        ))
        .bind(user_id.as_i32())
        .bind(book_id.as_i32())
        .bind(title)
        .fetch_one(&mut *tx)
        .await?;

        for (position, (front, back)) in (0i32..).zip(cards.iter()) {
            sqlx::query(
                "INSERT INTO flashcards (deck_id, front, back, position)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(deck.id.as_i32())
            .bind(front)
            .bind(back)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(deck)
    }

    /// Delete one of the user's decks (cards cascade).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the deck does not exist or
    /// belongs to another user.
    pub async fn delete_deck(&self, user_id: UserId, deck_id: DeckId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM flashcard_decks WHERE id = $2 AND user_id = $1")
                .bind(user_id.as_i32())
                .bind(deck_id.as_i32())
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
