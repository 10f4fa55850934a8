//! Chat history repository.

use sqlx::PgPool;

use bindery_core::UserId;

use super::RepositoryError;
use crate::models::ChatMessage;

const MESSAGE_COLUMNS: &str = "id, user_id, role, content, created_at";

/// Repository for stored chat messages.
pub struct ChatRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ChatRepository<'a> {
    /// Create a new chat repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append a message to the user's history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn append(
        &self,
        user_id: UserId,
        role: &str,
        content: &str,
    ) -> Result<ChatMessage, RepositoryError> {
        let message = sqlx::query_as::<_, ChatMessage>(&format!(
            "INSERT INTO chat_messages (user_id, role, content)
             VALUES ($1, $2, $3)
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(user_id.as_i32())
        .bind(role)
        .bind(content)
        .fetch_one(self.pool)
        .await?;
        Ok(message)
    }

    /// Fetch the user's history in chronological order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn fetch(&self, user_id: UserId) -> Result<Vec<ChatMessage>, RepositoryError> {
        let messages = sqlx::query_as::<_, ChatMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages
             WHERE user_id = $1 ORDER BY created_at, id"
        ))
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;
        Ok(messages)
    }

    /// Delete the user's entire history, returning the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM chat_messages WHERE user_id = $1")
            .bind(user_id.as_i32())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
