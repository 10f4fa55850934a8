//! Cart and purchase domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bindery_core::{BookId, Price, PurchaseId, UserId};

/// A cart line item: a denormalized book snapshot plus quantity.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartItem {
    pub user_id: UserId,
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub cover_url: Option<String>,
    pub price: Price,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

/// An immutable record of one completed checkout.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Purchase {
    pub id: PurchaseId,
    pub user_id: UserId,
    pub total: Price,
    /// Payment provider reference (checkout session ID).
    pub payment_ref: String,
    pub purchased_at: DateTime<Utc>,
}

/// A purchased-book snapshot inside a [`Purchase`].
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PurchaseItem {
    pub id: i32,
    pub purchase_id: PurchaseId,
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub cover_url: Option<String>,
    /// Content URL frozen at purchase time.
    pub content_url: Option<String>,
    pub price: Price,
}
