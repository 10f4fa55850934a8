//! Flashcard routes.
//!
//! Generation pulls the purchased book's PDF through the retrieval fallback
//! chain, sends it to the generative-AI API and persists the returned deck.
//! The feature is disabled wholesale when no API key is configured.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use bindery_core::{BookId, DeckId};

use crate::db::{FlashcardRepository, PurchaseRepository};
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/generate", post(generate))
        .route("/{id}", get(get_one).delete(delete))
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    book_id: BookId,
    /// Deck title; defaults to the book's title.
    title: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Value>, AppError> {
    let decks = FlashcardRepository::new(state.pool())
        .list_decks(current.id())
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Decks",
        "decks": decks,
    })))
}

async fn get_one(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DeckId>,
) -> Result<Json<Value>, AppError> {
    let repo = FlashcardRepository::new(state.pool());
    let deck = repo
        .get_deck(current.id(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("Deck not found".to_owned()))?;
    let cards = repo.cards(deck.id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Deck",
        "deck": deck,
        "cards": cards,
    })))
}

async fn generate(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<Value>, AppError> {
    let Some(client) = state.flashcards() else {
        return Err(AppError::Disabled(
            "Flashcard generation is not configured".to_owned(),
        ));
    };

    // Generation is gated on ownership: the PDF comes from the purchased
    // snapshot, not the live catalog row.
    let owned = PurchaseRepository::new(state.pool())
        .find_owned_item(current.id(), request.book_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Book not purchased".to_owned()))?;
    let content_url = owned.content_url.as_deref().ok_or_else(|| {
        AppError::Validation("This book has no PDF content".to_owned())
    })?;

    let pdf = state.pdf_retriever().fetch_pdf(content_url, None).await?;
    let cards = client.generate(&pdf).await?;

    let pairs: Vec<(String, String)> = cards
        .into_iter()
        .map(|card| (card.front, card.back))
        .collect();
    let title = request.title.unwrap_or_else(|| owned.title.clone());

    let repo = FlashcardRepository::new(state.pool());
    let deck = repo
        .create_deck(current.id(), request.book_id, &title, &pairs)
        .await?;
    let cards = repo.cards(deck.id).await?;

    info!(deck_id = %deck.id, cards = cards.len(), "flashcard deck generated");
    Ok(Json(json!({
        "success": true,
        "message": "Deck generated",
        "deck": deck,
        "cards": cards,
    })))
}

async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<DeckId>,
) -> Result<Json<Value>, AppError> {
    FlashcardRepository::new(state.pool())
        .delete_deck(current.id(), id)
        .await?;
    Ok(Json(json!({ "success": true, "message": "Deck deleted" })))
}
