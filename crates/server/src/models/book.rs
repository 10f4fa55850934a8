//! Book catalog domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bindery_core::{BookId, Price};

/// A catalog book.
///
/// `content_url` points at the object store; legacy rows may carry an
/// inconsistent `.pdf` suffix, which the media layer compensates for.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub description: String,
    pub genre: String,
    /// Category tags, e.g. `["fiction", "classics"]`.
    pub categories: Vec<String>,
    pub price: Price,
    /// Cover image URL on the object store.
    pub cover_url: Option<String>,
    /// Book content (PDF) URL on the object store.
    pub content_url: Option<String>,
    pub is_bestseller: bool,
    pub is_featured: bool,
    pub is_new_release: bool,
    pub published_at: DateTime<Utc>,
}

/// Fields accepted when creating or updating a book.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub categories: Vec<String>,
    pub price: Price,
    #[serde(default)]
    pub is_bestseller: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_new_release: bool,
}

/// Catalog listing filters, straight from the query string.
///
/// Flags are additive: each present flag narrows the result set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookFilter {
    /// Only books tagged with this category.
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub bestseller: Option<bool>,
    pub newrelease: Option<bool>,
}
