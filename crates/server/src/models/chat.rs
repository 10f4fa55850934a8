//! Chat history domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bindery_core::{MessageId, UserId};

/// One stored chat message.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: MessageId,
    pub user_id: UserId,
    /// `user` or `assistant`.
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
