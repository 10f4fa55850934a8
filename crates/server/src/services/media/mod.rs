//! Media CDN integration: signed uploads, URL normalization, the PDF
//! retrieval fallback chain and the image proxy cache.

pub mod cache;
pub mod error;
pub mod retrieve;
pub mod url;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, instrument};

use crate::config::MediaStoreConfig;

pub use cache::ImageCache;
pub use error::MediaError;
pub use retrieve::PdfRetriever;
pub use url::AssetUrl;

/// MIME types stored as images; anything else goes to the raw resource type.
const IMAGE_MIME_PREFIX: &str = "image/";

/// Successful upload response body. Only the fields we use.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

/// Error body the store returns on a rejected upload.
#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    error: UploadErrorMessage,
}

#[derive(Debug, Deserialize)]
struct UploadErrorMessage {
    message: String,
}

/// A stored asset as reported back by the upload API.
#[derive(Debug, Clone)]
pub struct UploadedAsset {
    /// Delivery URL. For PDFs the `.pdf` suffix is already stripped, so the
    /// stored form matches what the retrieval flow expects.
    pub url: String,
    /// Store-assigned public identifier.
    pub public_id: String,
}

struct Inner {
    config: MediaStoreConfig,
    client: reqwest::Client,
}

/// Client for the object store's signed upload API.
///
/// Cheap to clone; all clones share one HTTP connection pool.
#[derive(Clone)]
pub struct MediaStore {
    inner: Arc<Inner>,
}

impl MediaStore {
    /// Create a store client from configuration.
    #[must_use]
    pub fn new(config: MediaStoreConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                client: reqwest::Client::new(),
            }),
        }
    }

    /// Upload an image (covers, avatars). The store assigns the public id.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::UploadRejected` when the store refuses the file,
    /// `MediaError::Http` on transport failure.
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub async fn upload_image(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<UploadedAsset, MediaError> {
        self.upload(bytes, filename, content_type, None).await
    }

    /// Upload a book PDF under an explicit public id.
    ///
    /// The id is generated here (`book_{timestamp}_{random}`) rather than
    /// derived from the filename, so re-uploads of identically named files
    /// never collide. The returned URL has its `.pdf` suffix stripped before
    /// persisting; the retrieval flow probes both forms.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::UploadRejected` when the store refuses the file,
    /// `MediaError::Http` on transport failure.
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub async fn upload_book_pdf(&self, bytes: Vec<u8>) -> Result<UploadedAsset, MediaError> {
        let public_id = format!(
            "book_{}_{}",
            unix_timestamp(),
            rand::rng().random_range(100_000..1_000_000u32)
        );
        let mut asset = self
            .upload(bytes, "book.pdf", "application/pdf", Some(&public_id))
            .await?;
        if let Some(stripped) = asset
            .url
            .strip_suffix(".pdf")
            .or_else(|| asset.url.strip_suffix(".PDF"))
        {
            asset.url = stripped.to_owned();
        }
        Ok(asset)
    }

    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
        public_id: Option<&str>,
    ) -> Result<UploadedAsset, MediaError> {
        let config = &self.inner.config;
        let resource_type = resource_type_for(content_type);
        let timestamp = unix_timestamp().to_string();

        // Signature covers the sorted signable params followed by the secret.
        let mut params: Vec<(&str, &str)> = vec![
            ("folder", config.folder.as_str()),
            ("timestamp", timestamp.as_str()),
        ];
        if let Some(id) = public_id {
            params.push(("public_id", id));
        }
        params.sort_by_key(|(k, _)| *k);
        let signature = sign_params(&params, config.api_secret.expose_secret());

        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_owned())
            .mime_str(content_type)?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("api_key", config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", config.folder.clone())
            .text("signature", signature);
        if let Some(id) = public_id {
            form = form.text("public_id", id.to_owned());
        }

        let endpoint = format!(
            "{}/v1_1/{}/{resource_type}/upload",
            config.upload_base, config.cloud_name
        );
        let response = self.inner.client.post(&endpoint).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<UploadErrorBody>()
                .await
                .map_or_else(|_| format!("status {status}"), |body| body.error.message);
            return Err(MediaError::UploadRejected(message));
        }

        let body: UploadResponse = response.json().await?;
        info!(public_id = %body.public_id, "uploaded asset");
        Ok(UploadedAsset {
            url: body.secure_url,
            public_id: body.public_id,
        })
    }
}

/// Map a MIME type to the store's resource type path segment.
fn resource_type_for(content_type: &str) -> &'static str {
    if content_type.starts_with(IMAGE_MIME_PREFIX) {
        "image"
    } else {
        "raw"
    }
}

/// SHA-256 over `key=value&...` pairs (already sorted) plus the API secret,
/// hex encoded.
fn sign_params(sorted_params: &[(&str, &str)], api_secret: &str) -> String {
    let joined = sorted_params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;
    use secrecy::SecretString;

    use super::*;

    fn test_config(upload_base: &str) -> MediaStoreConfig {
        MediaStoreConfig {
            cloud_name: "test-cloud".to_string(),
            api_key: "key".to_string(),
            api_secret: SecretString::from("api-secret"),
            upload_base: upload_base.to_string(),
            folder: "bindery".to_string(),
        }
    }

    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn image_mime_maps_to_image_resource() {
        assert_eq!(resource_type_for("image/jpeg"), "image");
        assert_eq!(resource_type_for("image/png"), "image");
        assert_eq!(resource_type_for("application/pdf"), "raw");
    }

    #[test]
    fn signature_is_deterministic_hex() {
        let params = [("folder", "bindery"), ("timestamp", "1700000000")];
        let a = sign_params(&params, "secret");
        let b = sign_params(&params, "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signature_depends_on_secret() {
        let params = [("folder", "bindery"), ("timestamp", "1700000000")];
        assert_ne!(sign_params(&params, "one"), sign_params(&params, "two"));
    }

    #[tokio::test]
    async fn pdf_upload_strips_suffix_from_returned_url() {
        let router = Router::new().route(
            "/v1_1/test-cloud/raw/upload",
            post(|| async {
                axum::Json(serde_json::json!({
                    "secure_url": "https://res.example.com/test-cloud/raw/upload/v7/bindery/book_1_2.pdf",
                    "public_id": "bindery/book_1_2",
                }))
            }),
        );
        let base = spawn_upstream(router).await;

        let store = MediaStore::new(test_config(&base));
        let asset = store.upload_book_pdf(b"%PDF-1.4".to_vec()).await.unwrap();

        assert!(!asset.url.ends_with(".pdf"), "{}", asset.url);
        assert!(asset.public_id.starts_with("bindery/book_"));
    }

    #[tokio::test]
    async fn rejected_upload_surfaces_store_message() {
        let router = Router::new().route(
            "/v1_1/test-cloud/image/upload",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    axum::Json(serde_json::json!({
                        "error": { "message": "Invalid signature" }
                    })),
                )
            }),
        );
        let base = spawn_upstream(router).await;

        let store = MediaStore::new(test_config(&base));
        let err = store
            .upload_image(vec![0xFF, 0xD8], "cover.jpg", "image/jpeg")
            .await
            .unwrap_err();

        match err {
            MediaError::UploadRejected(message) => assert_eq!(message, "Invalid signature"),
            other => panic!("expected UploadRejected, got {other}"),
        }
    }
}
