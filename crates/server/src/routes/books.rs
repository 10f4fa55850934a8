//! Book catalog routes.
//!
//! Creation is multipart: a `data` part carrying the book JSON, an optional
//! `cover` image and an optional `content` PDF, both pushed to the object
//! store before the row is inserted.

use axum::extract::{Multipart, Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::info;

use bindery_core::BookId;

use crate::db::BookRepository;
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::{BookFilter, NewBook};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_one).put(update).delete(delete))
}

async fn list(
    State(state): State<AppState>,
    Query(filter): Query<BookFilter>,
) -> Result<Json<Value>, AppError> {
    let books = BookRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Books",
        "books": books,
    })))
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> Result<Json<Value>, AppError> {
    let book = BookRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Book not found".to_owned()))?;
    Ok(Json(json!({
        "success": true,
        "message": "Book",
        "book": book,
    })))
}

/// Parts collected from the create form.
struct CreateParts {
    data: Option<NewBook>,
    cover: Option<(Vec<u8>, String, String)>,
    content: Option<Vec<u8>>,
}

async fn collect_parts(mut multipart: Multipart) -> Result<CreateParts, AppError> {
    let mut parts = CreateParts {
        data: None,
        cover: None,
        content: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        match field.name() {
            Some("data") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                let book: NewBook = serde_json::from_str(&text)
                    .map_err(|e| AppError::Validation(format!("bad book data: {e}")))?;
                parts.data = Some(book);
            }
            Some("cover") => {
                let filename = field.file_name().unwrap_or("cover.jpg").to_owned();
                let content_type = field
                    .content_type()
                    .unwrap_or("image/jpeg")
                    .to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                parts.cover = Some((bytes.to_vec(), filename, content_type));
            }
            Some("content") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                parts.content = Some(bytes.to_vec());
            }
            _ => {}
        }
    }
    Ok(parts)
}

async fn create(
    State(state): State<AppState>,
    _current: CurrentUser,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let parts = collect_parts(multipart).await?;
    let book = parts
        .data
        .ok_or_else(|| AppError::Validation("missing 'data' part".to_owned()))?;

    let cover_url = match parts.cover {
        Some((bytes, filename, content_type)) => Some(
            state
                .media_store()
                .upload_image(bytes, &filename, &content_type)
                .await?
                .url,
        ),
        None => None,
    };

    let content_url = match parts.content {
        Some(bytes) => Some(state.media_store().upload_book_pdf(bytes).await?.url),
        None => None,
    };

    let created = BookRepository::new(state.pool())
        .create(&book, cover_url.as_deref(), content_url.as_deref())
        .await?;

    info!(book_id = %created.id, title = %created.title, "book created");
    Ok(Json(json!({
        "success": true,
        "message": "Book created",
        "book": created,
    })))
}

async fn update(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(id): Path<BookId>,
    Json(book): Json<NewBook>,
) -> Result<Json<Value>, AppError> {
    let updated = BookRepository::new(state.pool()).update(id, &book).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Book updated",
        "book": updated,
    })))
}

async fn delete(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(id): Path<BookId>,
) -> Result<Json<Value>, AppError> {
    BookRepository::new(state.pool()).delete(id).await?;
    info!(book_id = %id, "book deleted");
    Ok(Json(json!({ "success": true, "message": "Book deleted" })))
}
