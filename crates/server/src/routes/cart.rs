//! Cart routes. Every mutation is one atomic statement in the repository;
//! there is no read-modify-write anywhere on this path.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use bindery_core::{BookId, Price};

use crate::db::{BookRepository, CartRepository};
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::CartItem;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/add", post(add))
        .route("/remove", post(remove))
        .route("/clear", post(clear))
}

#[derive(Debug, Deserialize)]
struct CartItemRequest {
    book_id: BookId,
}

/// Sum of price times quantity across the cart.
pub(crate) fn cart_total(items: &[CartItem]) -> Price {
    let total: Decimal = items
        .iter()
        .map(|item| item.price.amount() * Decimal::from(item.quantity))
        .sum();
    Price::new(total)
}

async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Value>, AppError> {
    let items = CartRepository::new(state.pool()).list(current.id()).await?;
    let total = cart_total(&items);
    Ok(Json(json!({
        "success": true,
        "message": "Cart",
        "items": items,
        "total": total,
    })))
}

async fn add(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CartItemRequest>,
) -> Result<Json<Value>, AppError> {
    let book = BookRepository::new(state.pool())
        .get(request.book_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Book not found".to_owned()))?;

    let inserted = CartRepository::new(state.pool())
        .add(current.id(), &book)
        .await?;
    let message = if inserted {
        "Book added to cart"
    } else {
        "Book already in cart"
    };
    Ok(Json(json!({ "success": true, "message": message })))
}

async fn remove(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CartItemRequest>,
) -> Result<Json<Value>, AppError> {
    CartRepository::new(state.pool())
        .remove(current.id(), request.book_id)
        .await?;
    Ok(Json(json!({ "success": true, "message": "Book removed from cart" })))
}

async fn clear(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Value>, AppError> {
    let removed = CartRepository::new(state.pool()).clear(current.id()).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Cart cleared",
        "removed": removed,
    })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use bindery_core::UserId;

    use super::*;

    fn item(cents: i64, quantity: i32) -> CartItem {
        CartItem {
            user_id: UserId::new(1),
            book_id: BookId::new(1),
            title: "T".to_owned(),
            author: "A".to_owned(),
            cover_url: None,
            price: Price::from_cents(cents),
            quantity,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn total_sums_price_times_quantity() {
        let total = cart_total(&[item(1999, 1), item(500, 3)]);
        assert_eq!(total.as_cents(), Some(3499));
    }

    #[test]
    fn empty_cart_totals_zero() {
        assert_eq!(cart_total(&[]).as_cents(), Some(0));
    }
}
