//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bindery_core::{Email, UserId, Username};

/// A bookstore account.
///
/// `password_hash` is `None` for OAuth-only accounts. The reset code pair is
/// short-lived, single-use state for the forgot-password flow.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique account username.
    pub username: Username,
    /// Unique email address.
    pub email: Email,
    /// Argon2 password hash; absent for OAuth-only accounts.
    pub password_hash: Option<String>,
    /// External identity ID when the account was created via Google OAuth.
    pub google_id: Option<String>,
    /// Outstanding password-reset code, if any.
    pub reset_code: Option<String>,
    /// When the reset code stops being accepted.
    pub reset_code_expires_at: Option<DateTime<Utc>>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// The subset of [`User`] exposed over the API.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: Username,
    pub email: Email,
    /// Whether the account logs in with a password (false = OAuth-only).
    pub has_password: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            has_password: user.password_hash.is_some(),
            created_at: user.created_at,
        }
    }
}
