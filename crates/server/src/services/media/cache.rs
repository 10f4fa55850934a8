//! On-disk image cache for the proxy endpoint.
//!
//! Entries are files named by a reversible encoding of the source URL.
//! Writes go through a temp file and rename, so a racing first access can at
//! worst duplicate a fetch, never serve a torn file. The cache carries a
//! byte-size cap: once an insert pushes the directory over it, the
//! oldest-modified entries are evicted until the total fits again.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use rand::Rng;
use tracing::{debug, instrument, warn};

use super::error::MediaError;
use crate::config::ImageCacheConfig;

/// Timeout for remote image fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Browser-like identification; some image hosts reject unidentified clients.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Encode a source URL into a filename-safe, reversible cache key.
///
/// Percent-encoding keeps `[A-Za-z0-9_.~-]` verbatim and escapes everything
/// else, so distinct URLs can never collide and the key decodes back to the
/// URL.
#[must_use]
pub fn cache_key(url: &str) -> String {
    urlencoding::encode(url).into_owned()
}

/// Decode a cache filename back into its source URL.
#[must_use]
pub fn source_url(key: &str) -> Option<String> {
    urlencoding::decode(key).ok().map(|s| s.into_owned())
}

/// Temp-file sibling for a cache entry.
///
/// The suffix is appended to the full entry name, never substituted for its
/// last dot-segment, so keys that differ only in their URL extension
/// (`cover.jpg` vs `cover.png`) get distinct temp paths. The random component
/// keeps concurrent writers of one key off each other's file.
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(OsString::new, ToOwned::to_owned);
    name.push(format!(".{:08x}.part", rand::rng().random::<u32>()));
    path.with_file_name(name)
}

/// Disk-backed image cache with a byte-size cap.
#[derive(Clone)]
pub struct ImageCache {
    dir: PathBuf,
    max_bytes: u64,
    placeholder_path: Option<PathBuf>,
    client: reqwest::Client,
}

impl ImageCache {
    /// Create a cache rooted at the configured directory.
    ///
    /// The directory is created on first insert, not here, so construction
    /// never fails.
    #[must_use]
    pub fn new(config: &ImageCacheConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            max_bytes: config.max_bytes,
            placeholder_path: config.placeholder_path.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// The on-disk path for a source URL.
    #[must_use]
    pub fn entry_path(&self, url: &str) -> PathBuf {
        self.dir.join(cache_key(url))
    }

    /// Serve an image, fetching and caching it on a miss.
    ///
    /// On a remote failure the bundled placeholder is served when
    /// configured; otherwise the fetch error propagates.
    ///
    /// # Errors
    ///
    /// Returns `MediaError` if the fetch fails with no placeholder
    /// configured, or on cache I/O failure.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_or_fetch(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        let path = self.entry_path(url);

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!("image cache hit");
                return Ok(bytes);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(MediaError::Io(e)),
        }

        match self.fetch_remote(url).await {
            Ok(bytes) => {
                self.insert(&path, &bytes).await?;
                Ok(bytes)
            }
            Err(e) => match &self.placeholder_path {
                Some(placeholder) => {
                    warn!(error = %e, "image fetch failed, serving placeholder");
                    Ok(tokio::fs::read(placeholder).await?)
                }
                None => Err(e),
            },
        }
    }

    /// Fetch the remote image with browser-like headers.
    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::REFERER, url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::UpstreamStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Write an entry via temp file + rename, then enforce the size cap.
    async fn insert(&self, path: &Path, bytes: &[u8]) -> Result<(), MediaError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let tmp = tmp_path(path);
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;

        self.evict_to_cap().await?;
        Ok(())
    }

    /// Evict oldest-modified entries until the directory fits the cap.
    async fn evict_to_cap(&self) -> Result<(), MediaError> {
        let mut entries: Vec<(PathBuf, u64, SystemTime)> = Vec::new();
        let mut total: u64 = 0;

        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            total += meta.len();
            entries.push((entry.path(), meta.len(), modified));
        }

        if total <= self.max_bytes {
            return Ok(());
        }

        entries.sort_by_key(|(_, _, modified)| *modified);
        for (path, len, _) in entries {
            if total <= self.max_bytes {
                break;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    // Keys decode back to their source URL; log that form.
                    let url = path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .and_then(source_url)
                        .unwrap_or_else(|| path.display().to_string());
                    debug!(%url, "evicted cache entry");
                    total = total.saturating_sub(len);
                }
                // A concurrent request may have already evicted it.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(MediaError::Io(e)),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Router;
    use axum::extract::State;
    use axum::routing::get;

    use super::*;

    fn test_config(dir: &Path, max_bytes: u64) -> ImageCacheConfig {
        ImageCacheConfig {
            dir: dir.to_path_buf(),
            max_bytes,
            placeholder_path: None,
        }
    }

    async fn spawn_counting_upstream() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = Arc::clone(&hits);
        let router = Router::new()
            .route(
                "/cover.jpg",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    "jpeg-bytes"
                }),
            )
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{addr}"), hits)
    }

    #[test]
    fn cache_key_is_reversible() {
        let url = "https://img.example.com/covers/a b.jpg?w=300&h=450";
        let key = cache_key(url);
        assert!(!key.contains('/'));
        assert!(!key.contains('?'));
        assert_eq!(source_url(&key).unwrap(), url);
    }

    #[test]
    fn temp_names_append_to_the_full_entry_name() {
        // Appending (not substituting the last dot-segment) keeps keys that
        // differ only in their URL extension on separate temp files.
        for ext in ["jpg", "png"] {
            let entry = PathBuf::from(format!(
                "/cache/https%3A%2F%2Fimg.example.com%2Fcover.{ext}"
            ));
            let tmp = tmp_path(&entry);
            let tmp_name = tmp.file_name().unwrap().to_str().unwrap();
            let entry_name = entry.file_name().unwrap().to_str().unwrap();
            assert!(tmp_name.starts_with(entry_name), "{tmp_name}");
            assert!(tmp_name.ends_with(".part"), "{tmp_name}");
        }
    }

    #[tokio::test]
    async fn concurrent_inserts_for_similar_urls_do_not_cross_contaminate() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(&test_config(tmp.path(), u64::MAX));

        let jpg = cache.entry_path("https://img.example.com/cover.jpg");
        let png = cache.entry_path("https://img.example.com/cover.png");

        let (a, b) = tokio::join!(
            cache.insert(&jpg, b"jpg-bytes"),
            cache.insert(&png, b"png-bytes"),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(tokio::fs::read(&jpg).await.unwrap(), b"jpg-bytes");
        assert_eq!(tokio::fs::read(&png).await.unwrap(), b"png-bytes");
    }

    #[test]
    fn distinct_urls_get_distinct_keys() {
        assert_ne!(
            cache_key("https://a.example.com/x.jpg"),
            cache_key("https://a.example.com/y.jpg")
        );
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let (base, hits) = spawn_counting_upstream().await;
        let cache = ImageCache::new(&test_config(tmp.path(), u64::MAX));

        let url = format!("{base}/cover.jpg");
        let first = cache.get_or_fetch(&url).await.unwrap();
        let second = cache.get_or_fetch(&url).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deleting_the_entry_causes_a_refetch() {
        let tmp = tempfile::tempdir().unwrap();
        let (base, hits) = spawn_counting_upstream().await;
        let cache = ImageCache::new(&test_config(tmp.path(), u64::MAX));

        let url = format!("{base}/cover.jpg");
        cache.get_or_fetch(&url).await.unwrap();
        tokio::fs::remove_file(cache.entry_path(&url)).await.unwrap();
        cache.get_or_fetch(&url).await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn eviction_keeps_directory_under_cap() {
        let tmp = tempfile::tempdir().unwrap();
        // Cap fits roughly two 10-byte entries.
        let cache = ImageCache::new(&test_config(tmp.path(), 25));

        for i in 0..4u8 {
            let path = cache.entry_path(&format!("https://img.example.com/{i}.jpg"));
            cache.insert(&path, b"0123456789").await.unwrap();
            // Distinct mtimes so eviction order is deterministic.
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let mut total = 0u64;
        let mut dir = tokio::fs::read_dir(tmp.path()).await.unwrap();
        while let Some(entry) = dir.next_entry().await.unwrap() {
            total += entry.metadata().await.unwrap().len();
        }
        assert!(total <= 25, "cache grew past the cap: {total}");
    }

    #[tokio::test]
    async fn fetch_failure_serves_placeholder_when_configured() {
        let tmp = tempfile::tempdir().unwrap();
        let placeholder = tmp.path().join("default.jpg");
        tokio::fs::write(&placeholder, b"placeholder-bytes")
            .await
            .unwrap();

        let config = ImageCacheConfig {
            dir: tmp.path().join("cache"),
            max_bytes: u64::MAX,
            placeholder_path: Some(placeholder),
        };
        let cache = ImageCache::new(&config);

        // Nothing is listening on this port.
        let bytes = cache
            .get_or_fetch("http://127.0.0.1:1/missing.jpg")
            .await
            .unwrap();
        assert_eq!(bytes, b"placeholder-bytes");
    }
}
