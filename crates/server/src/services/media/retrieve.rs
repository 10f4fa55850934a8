//! PDF retrieval fallback chain.
//!
//! Stored content URLs predate the current upload conventions, so a single
//! fetch is not reliable. The flow tries derived URLs in strict order until
//! one yields bytes; attempts are sequential, each with its own timeout, and
//! nothing here mutates stored URLs (the CLI repair flow does that).

use std::time::Duration;

use tracing::{debug, instrument};

use super::error::MediaError;
use super::url::AssetUrl;

/// Timeout for direct fetches of plain HTTP resources.
const DIRECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for object-store fetches, which can be slow for large PDFs.
const STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Retrieves PDF bytes through the fallback chain.
#[derive(Clone)]
pub struct PdfRetriever {
    client: reqwest::Client,
}

impl PdfRetriever {
    /// Create a retriever with its own HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Fetch PDF bytes for a stored URL.
    ///
    /// Attempt order:
    /// 1. URL does not reference the object store: fetch it directly.
    /// 2. Normalize and fetch the reconstructed URL with the `pdf` hint.
    /// 3. Fetch the reconstructed URL without the hint.
    /// 4. Fetch `original_url` (or the stored URL) directly as a last resort.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::AssetUnavailable` carrying every attempt's error
    /// when the whole chain is exhausted.
    #[instrument(skip(self), fields(url = %stored_url))]
    pub async fn fetch_pdf(
        &self,
        stored_url: &str,
        original_url: Option<&str>,
    ) -> Result<Vec<u8>, MediaError> {
        let mut attempts: Vec<String> = Vec::new();

        if AssetUrl::references_store(stored_url) {
            match AssetUrl::parse(stored_url) {
                Ok(asset) => {
                    debug!(
                        public_id = %asset.public_id(),
                        version = %asset.version(),
                        "normalized store url"
                    );
                    let with_hint = asset.retrieval_url(true);
                    match self.try_fetch(&with_hint, STORE_TIMEOUT).await {
                        Ok(bytes) => return Ok(bytes),
                        Err(e) => attempts.push(format!("{with_hint}: {e}")),
                    }

                    let without_hint = asset.retrieval_url(false);
                    match self.try_fetch(&without_hint, STORE_TIMEOUT).await {
                        Ok(bytes) => return Ok(bytes),
                        Err(e) => attempts.push(format!("{without_hint}: {e}")),
                    }
                }
                Err(e) => attempts.push(format!("normalize {stored_url}: {e}")),
            }
        } else {
            match self.try_fetch(stored_url, DIRECT_TIMEOUT).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => attempts.push(format!("{stored_url}: {e}")),
            }
        }

        // Last resort: the original form, fetched as a plain resource.
        let last = original_url.unwrap_or(stored_url);
        match self.try_fetch(last, DIRECT_TIMEOUT).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                attempts.push(format!("{last}: {e}"));
                Err(MediaError::AssetUnavailable { attempts })
            }
        }
    }

    /// One bounded fetch; any non-success status is an error.
    async fn try_fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, MediaError> {
        debug!(url, "attempting pdf fetch");
        let response = self.client.get(url).timeout(timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::UpstreamStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

impl Default for PdfRetriever {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Router;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::get;

    use super::*;

    /// Spawn a mock upstream that 404s store paths and counts hits.
    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn non_store_url_is_fetched_directly() {
        let base = spawn_upstream(Router::new().route(
            "/files/book.pdf",
            get(|| async { "direct-bytes" }),
        ))
        .await;

        let retriever = PdfRetriever::new();
        let bytes = retriever
            .fetch_pdf(&format!("{base}/files/book.pdf"), None)
            .await
            .unwrap();
        assert_eq!(bytes, b"direct-bytes");
    }

    #[tokio::test]
    async fn falls_through_to_original_on_store_failure() {
        let store_hits = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&store_hits);

        let router = Router::new()
            .route(
                "/demo/raw/upload/{version}/{*rest}",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    StatusCode::NOT_FOUND
                }),
            )
            .route("/original/book", get(|| async { "original-bytes" }))
            .with_state(hits);
        let base = spawn_upstream(router).await;

        let stored = format!("{base}/demo/raw/upload/v42/books/lost.pdf");
        let original = format!("{base}/original/book");

        let retriever = PdfRetriever::new();
        let bytes = retriever
            .fetch_pdf(&stored, Some(&original))
            .await
            .unwrap();

        assert_eq!(bytes, b"original-bytes");
        // Both the hinted and unhinted store forms must have been probed.
        assert_eq!(store_hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausted_chain_reports_every_attempt() {
        let base = spawn_upstream(Router::new()).await; // 404s everything

        let stored = format!("{base}/demo/raw/upload/v42/books/gone.pdf");
        let retriever = PdfRetriever::new();
        let err = retriever.fetch_pdf(&stored, None).await.unwrap_err();

        match err {
            MediaError::AssetUnavailable { attempts } => {
                // with-hint, without-hint, original
                assert_eq!(attempts.len(), 3);
            }
            other => panic!("expected AssetUnavailable, got {other}"),
        }
    }

    #[tokio::test]
    async fn store_url_with_hint_succeeding_short_circuits() {
        let store_hits = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&store_hits);

        let router = Router::new()
            .route(
                "/demo/raw/upload/v42/books/found.pdf",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    "store-bytes"
                }),
            )
            .with_state(hits);
        let base = spawn_upstream(router).await;

        let stored = format!("{base}/demo/raw/upload/v42/books/found.pdf");
        let retriever = PdfRetriever::new();
        let bytes = retriever.fetch_pdf(&stored, None).await.unwrap();

        assert_eq!(bytes, b"store-bytes");
        assert_eq!(store_hits.load(Ordering::SeqCst), 1);
    }
}
