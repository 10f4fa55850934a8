//! Checkout routes.
//!
//! `session` creates a provider checkout session for the current cart;
//! `confirm` verifies the session is paid, then records the immutable
//! purchase and clears the cart in one transaction. Confirming the same
//! session twice is a 400 Conflict from the repository.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::db::{CartRepository, PurchaseRepository};
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::state::AppState;

use super::cart::cart_total;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session", post(create_session))
        .route("/confirm", post(confirm))
}

#[derive(Debug, Deserialize)]
struct ConfirmRequest {
    session_id: String,
}

async fn create_session(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Value>, AppError> {
    let items = CartRepository::new(state.pool()).list(current.id()).await?;

    let base = &state.config().base_url;
    let success_url = format!("{base}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}");
    let cancel_url = format!("{base}/cart");

    let session = state
        .stripe()
        .create_checkout_session(&items, &success_url, &cancel_url)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Checkout session created",
        "session_id": session.id,
        "url": session.url,
    })))
}

async fn confirm(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<Value>, AppError> {
    let status = state.stripe().retrieve_session(&request.session_id).await?;
    if !status.is_paid() {
        return Err(AppError::Validation("Payment not completed".to_owned()));
    }

    let items = CartRepository::new(state.pool()).list(current.id()).await?;
    if items.is_empty() {
        return Err(AppError::Validation(
            "Nothing to record: cart is empty".to_owned(),
        ));
    }

    let total = cart_total(&items);
    let purchase = PurchaseRepository::new(state.pool())
        .record(current.id(), &items, total, &status.id)
        .await?;

    info!(purchase_id = %purchase.id, total = %total, "purchase recorded");
    Ok(Json(json!({
        "success": true,
        "message": "Purchase recorded",
        "purchase": purchase,
    })))
}

/// `GET /api/purchases`: the user's purchase history with line items.
pub async fn list_purchases(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Value>, AppError> {
    let purchases = PurchaseRepository::new(state.pool());
    let records = purchases.list_for_user(current.id()).await?;

    let mut history = Vec::with_capacity(records.len());
    for purchase in records {
        let items = purchases.items(purchase.id).await?;
        history.push(json!({ "purchase": purchase, "items": items }));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Purchases",
        "purchases": history,
    })))
}
