//! Asset routes: URL resolution, PDF retrieval and the image proxy.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use bindery_core::BookId;

use crate::db::PurchaseRepository;
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::media::AssetUrl;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signed-url", get(signed_url))
        .route("/fetch-pdf", get(fetch_pdf))
        .route("/serve-pdf/{book_id}", get(serve_pdf))
        .route("/placeholder-pdf", get(placeholder_pdf))
        .route("/image-proxy", get(image_proxy))
        .route("/upload-image", post(upload_image))
}

#[derive(Debug, Deserialize)]
struct UrlQuery {
    url: String,
    /// Pre-normalization URL the client may still hold; used as the final
    /// fallback in the retrieval chain.
    original: Option<String>,
}

fn pdf_response(bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, "inline"),
        ],
        bytes,
    )
        .into_response()
}

/// Resolve a stored asset URL into its canonical retrieval form.
///
/// Raw (non-image) store objects get the explicit `.pdf` format hint, images
/// keep their stored form. Resolutions are cached; they are pure string work
/// but sit on the hot path for catalog pages.
async fn signed_url(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<Value>, AppError> {
    if let Some(resolved) = state.asset_urls().get(&query.url).await {
        return Ok(Json(json!({
            "success": true,
            "message": "Resolved",
            "url": resolved,
        })));
    }

    let asset = AssetUrl::parse(&query.url)?;
    let pdf_hint = query.url.contains("/raw/upload/");
    let resolved = asset.retrieval_url(pdf_hint);

    state
        .asset_urls()
        .insert(query.url.clone(), resolved.clone())
        .await;
    Ok(Json(json!({
        "success": true,
        "message": "Resolved",
        "url": resolved,
    })))
}

/// Fetch PDF bytes for an arbitrary stored URL through the fallback chain.
async fn fetch_pdf(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(query): Query<UrlQuery>,
) -> Result<Response, AppError> {
    let bytes = state
        .pdf_retriever()
        .fetch_pdf(&query.url, query.original.as_deref())
        .await?;
    Ok(pdf_response(bytes))
}

/// Serve a purchased book's PDF. Ownership is checked against the purchase
/// snapshot, whose content URL was frozen at checkout.
async fn serve_pdf(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(book_id): Path<BookId>,
) -> Result<Response, AppError> {
    let owned = PurchaseRepository::new(state.pool())
        .find_owned_item(current.id(), book_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Book not purchased".to_owned()))?;
    let content_url = owned.content_url.as_deref().ok_or_else(|| {
        AppError::Validation("This book has no PDF content".to_owned())
    })?;

    let bytes = state.pdf_retriever().fetch_pdf(content_url, None).await?;
    Ok(pdf_response(bytes))
}

/// The bundled placeholder PDF, for books whose content is unavailable.
async fn placeholder_pdf(State(state): State<AppState>) -> Result<Response, AppError> {
    let path = state
        .config()
        .placeholder_pdf_path
        .as_ref()
        .ok_or_else(|| AppError::NotFound("No placeholder configured".to_owned()))?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(crate::services::media::MediaError::Io)?;
    Ok(pdf_response(bytes))
}

/// Proxy and cache a remote image.
///
/// Responses are typed `image/jpeg` regardless of source format; browsers
/// sniff the real type and clients only use this for cover thumbnails.
async fn image_proxy(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> Result<Response, AppError> {
    let bytes = state.image_cache().get_or_fetch(&query.url).await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
}

/// Upload an image to the object store, returning its delivery URL.
async fn upload_image(
    State(state): State<AppState>,
    _current: CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        if field.file_name().is_none() {
            continue;
        }
        let filename = field.file_name().unwrap_or("image").to_owned();
        let content_type = field.content_type().unwrap_or("image/jpeg").to_owned();
        if !content_type.starts_with("image/") {
            return Err(AppError::Validation(
                "Only image uploads are accepted here".to_owned(),
            ));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let asset = state
            .media_store()
            .upload_image(bytes.to_vec(), &filename, &content_type)
            .await?;
        info!(public_id = %asset.public_id, "image uploaded");
        return Ok(Json(json!({
            "success": true,
            "message": "Image uploaded",
            "url": asset.url,
            "public_id": asset.public_id,
        })));
    }
    Err(AppError::Validation("No file in upload".to_owned()))
}
