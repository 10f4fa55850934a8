//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use crate::config::BinderyConfig;
use crate::services::auth::AuthService;
use crate::services::flashcards::FlashcardClient;
use crate::services::media::{ImageCache, MediaStore, PdfRetriever};
use crate::services::payments::StripeClient;

/// Resolved asset URLs are immutable for a given stored URL, so a short TTL
/// only bounds memory, not staleness.
const ASSET_URL_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
const ASSET_URL_CACHE_CAPACITY: u64 = 10_000;

struct Inner {
    config: BinderyConfig,
    pool: PgPool,
    auth: AuthService,
    media_store: MediaStore,
    pdf_retriever: PdfRetriever,
    image_cache: ImageCache,
    stripe: StripeClient,
    flashcards: Option<FlashcardClient>,
    asset_urls: Cache<String, String>,
}

/// Handle shared across all request handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl AppState {
    /// Assemble state from configuration and an established pool.
    #[must_use]
    pub fn new(config: BinderyConfig, pool: PgPool) -> Self {
        let auth = AuthService::new(&config.jwt_secret, config.google.clone());
        let media_store = MediaStore::new(config.media.clone());
        let image_cache = ImageCache::new(&config.image_cache);
        let stripe = StripeClient::new(config.stripe.clone());
        let flashcards = config.flashcards.clone().map(FlashcardClient::new);
        let asset_urls = Cache::builder()
            .max_capacity(ASSET_URL_CACHE_CAPACITY)
            .time_to_live(ASSET_URL_CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(Inner {
                config,
                pool,
                auth,
                media_store,
                pdf_retriever: PdfRetriever::new(),
                image_cache,
                stripe,
                flashcards,
                asset_urls,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &BinderyConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn media_store(&self) -> &MediaStore {
        &self.inner.media_store
    }

    #[must_use]
    pub fn pdf_retriever(&self) -> &PdfRetriever {
        &self.inner.pdf_retriever
    }

    #[must_use]
    pub fn image_cache(&self) -> &ImageCache {
        &self.inner.image_cache
    }

    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    /// Flashcard generation client; `None` when the feature is not configured.
    #[must_use]
    pub fn flashcards(&self) -> Option<&FlashcardClient> {
        self.inner.flashcards.as_ref()
    }

    /// Cache of stored URL to resolved delivery URL.
    #[must_use]
    pub fn asset_urls(&self) -> &Cache<String, String> {
        &self.inner.asset_urls
    }

    /// Echoing internal detail (reset codes, error chains) is only allowed
    /// outside production.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.inner.config.is_production()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
