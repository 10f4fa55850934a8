//! Media layer errors.

use thiserror::Error;

/// Errors from the object-store client, URL normalizer, retrieval flow and
/// image cache.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The URL has no `upload` path segment, so it cannot be normalized.
    /// Callers fall back to fetching the original URL directly.
    #[error("not an object-store URL: {0}")]
    InvalidAssetUrl(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("upstream returned {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    /// The store rejected an upload.
    #[error("upload rejected: {0}")]
    UploadRejected(String),

    /// Every retrieval strategy failed. Carries the distinct error from each
    /// attempt for diagnostics.
    #[error("asset unavailable after {} attempts", attempts.len())]
    AssetUnavailable {
        /// One entry per failed attempt, in attempt order.
        attempts: Vec<String>,
    },

    /// Disk cache I/O failed.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}
