//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BINDERY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `BINDERY_BASE_URL` - Public URL for the API (used for checkout redirects)
//! - `BINDERY_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `MEDIA_CLOUD_NAME` - Object store cloud name
//! - `MEDIA_API_KEY` - Object store API key
//! - `MEDIA_API_SECRET` - Object store API secret
//! - `STRIPE_SECRET_KEY` - Stripe secret key
//!
//! ## Optional
//! - `BINDERY_HOST` - Bind address (default: 127.0.0.1)
//! - `BINDERY_PORT` - Listen port (default: 4000)
//! - `BINDERY_ENV` - `development` or `production` (default: development)
//! - `MEDIA_UPLOAD_BASE` - Object store upload API base URL
//! - `MEDIA_FOLDER` - Upload folder (default: bindery)
//! - `STRIPE_API_BASE` - Stripe API base URL (override for testing)
//! - `FLASHCARDS_API_KEY` / `FLASHCARDS_MODEL` / `FLASHCARDS_API_BASE` - Generative-AI API
//! - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET` / `GOOGLE_REDIRECT_URL` - OAuth login
//! - `IMAGE_CACHE_DIR` - On-disk image cache directory (default: image-cache)
//! - `IMAGE_CACHE_MAX_BYTES` - Cache size cap in bytes (default: 268435456)
//! - `PLACEHOLDER_IMAGE_PATH` - Fallback image served when a proxy fetch fails
//! - `PLACEHOLDER_PDF_PATH` - PDF served by the placeholder endpoint
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_IMAGE_CACHE_MAX_BYTES: u64 = 256 * 1024 * 1024;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Bindery application configuration.
#[derive(Debug, Clone)]
pub struct BinderyConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the API
    pub base_url: String,
    /// Deployment environment (`development` or `production`)
    pub environment: String,
    /// Token signing secret
    pub jwt_secret: SecretString,
    /// Object store configuration
    pub media: MediaStoreConfig,
    /// Stripe configuration
    pub stripe: StripeConfig,
    /// Generative-AI flashcards configuration (absent disables generation)
    pub flashcards: Option<FlashcardsConfig>,
    /// Google OAuth configuration (absent disables OAuth login)
    pub google: Option<GoogleOAuthConfig>,
    /// Image proxy cache configuration
    pub image_cache: ImageCacheConfig,
    /// PDF served by the placeholder endpoint
    pub placeholder_pdf_path: Option<PathBuf>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Object store (media CDN) configuration.
///
/// Implements `Debug` manually to redact the API secret.
#[derive(Clone)]
pub struct MediaStoreConfig {
    /// Cloud name identifying the account on the store
    pub cloud_name: String,
    /// API key sent with signed uploads
    pub api_key: String,
    /// API secret used to sign upload requests
    pub api_secret: SecretString,
    /// Base URL uploads are posted to
    pub upload_base: String,
    /// Folder uploads are placed under
    pub folder: String,
}

impl std::fmt::Debug for MediaStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStoreConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("upload_base", &self.upload_base)
            .field("folder", &self.folder)
            .finish()
    }
}

/// Stripe payment configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret key
    pub secret_key: SecretString,
    /// API base URL (overridable for tests)
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Generative-AI API configuration for flashcard generation.
#[derive(Clone)]
pub struct FlashcardsConfig {
    /// API key
    pub api_key: SecretString,
    /// Model identifier
    pub model: String,
    /// API base URL (overridable for tests)
    pub api_base: String,
}

impl std::fmt::Debug for FlashcardsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashcardsConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Google OAuth configuration.
#[derive(Clone)]
pub struct GoogleOAuthConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: SecretString,
    /// Redirect URL registered with the provider
    pub redirect_url: String,
}

impl std::fmt::Debug for GoogleOAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleOAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

/// Image proxy disk cache configuration.
#[derive(Debug, Clone)]
pub struct ImageCacheConfig {
    /// Directory cache entries are written to
    pub dir: PathBuf,
    /// Total size cap in bytes; oldest entries are evicted past this
    pub max_bytes: u64,
    /// Image served when the remote fetch fails
    pub placeholder_path: Option<PathBuf>,
}

impl BinderyConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the JWT secret fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("BINDERY_DATABASE_URL")?;
        let host = get_env_or_default("BINDERY_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("BINDERY_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("BINDERY_PORT", "4000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("BINDERY_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("BINDERY_BASE_URL")?;
        let environment = get_env_or_default("BINDERY_ENV", "development");

        let jwt_secret = get_validated_secret("BINDERY_JWT_SECRET")?;
        validate_jwt_secret(&jwt_secret, "BINDERY_JWT_SECRET")?;

        let media = MediaStoreConfig::from_env()?;
        let stripe = StripeConfig::from_env()?;
        let flashcards = FlashcardsConfig::from_env();
        let google = GoogleOAuthConfig::from_env()?;
        let image_cache = ImageCacheConfig::from_env()?;
        let placeholder_pdf_path = get_optional_env("PLACEHOLDER_PDF_PATH").map(PathBuf::from);
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            environment,
            jwt_secret,
            media,
            stripe,
            flashcards,
            google,
            image_cache,
            placeholder_pdf_path,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the deployment environment is production.
    ///
    /// Controls whether internal error detail is echoed in responses.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl MediaStoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cloud_name: get_required_env("MEDIA_CLOUD_NAME")?,
            api_key: get_required_env("MEDIA_API_KEY")?,
            api_secret: get_required_secret("MEDIA_API_SECRET")?,
            upload_base: get_env_or_default("MEDIA_UPLOAD_BASE", "https://api.cloudinary.com"),
            folder: get_env_or_default("MEDIA_FOLDER", "bindery"),
        })
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret_key: get_required_secret("STRIPE_SECRET_KEY")?,
            api_base: get_env_or_default("STRIPE_API_BASE", "https://api.stripe.com"),
        })
    }
}

impl FlashcardsConfig {
    fn from_env() -> Option<Self> {
        let api_key = get_optional_env("FLASHCARDS_API_KEY")?;
        Some(Self {
            api_key: SecretString::from(api_key),
            model: get_env_or_default("FLASHCARDS_MODEL", "claude-sonnet-4-5"),
            api_base: get_env_or_default("FLASHCARDS_API_BASE", "https://api.anthropic.com"),
        })
    }
}

impl GoogleOAuthConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(client_id) = get_optional_env("GOOGLE_CLIENT_ID") else {
            return Ok(None);
        };
        Ok(Some(Self {
            client_id,
            client_secret: get_required_secret("GOOGLE_CLIENT_SECRET")?,
            redirect_url: get_required_env("GOOGLE_REDIRECT_URL")?,
        }))
    }
}

impl ImageCacheConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_bytes = match get_optional_env("IMAGE_CACHE_MAX_BYTES") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("IMAGE_CACHE_MAX_BYTES".to_string(), e.to_string())
            })?,
            None => DEFAULT_IMAGE_CACHE_MAX_BYTES,
        };

        Ok(Self {
            dir: PathBuf::from(get_env_or_default("IMAGE_CACHE_DIR", "image-cache")),
            max_bytes,
            placeholder_path: get_optional_env("PLACEHOLDER_IMAGE_PATH").map(PathBuf::from),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that the JWT secret meets minimum length requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_degenerate_inputs() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InsecureSecret(_, _)
        ));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_jwt_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_jwt_secret(&secret, "TEST_JWT").is_err());
    }

    #[test]
    fn test_validate_jwt_secret_valid_length() {
        let secret = SecretString::from("a".repeat(32));
        assert!(validate_jwt_secret(&secret, "TEST_JWT").is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = BinderyConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 4000,
            base_url: "http://localhost:4000".to_string(),
            environment: "development".to_string(),
            jwt_secret: SecretString::from("x".repeat(32)),
            media: MediaStoreConfig {
                cloud_name: "test-cloud".to_string(),
                api_key: "key".to_string(),
                api_secret: SecretString::from("api-secret"),
                upload_base: "https://api.cloudinary.com".to_string(),
                folder: "bindery".to_string(),
            },
            stripe: StripeConfig {
                secret_key: SecretString::from("sk_test"),
                api_base: "https://api.stripe.com".to_string(),
            },
            flashcards: None,
            google: None,
            image_cache: ImageCacheConfig {
                dir: PathBuf::from("image-cache"),
                max_bytes: DEFAULT_IMAGE_CACHE_MAX_BYTES,
                placeholder_path: None,
            },
            placeholder_pdf_path: None,
            sentry_dsn: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 4000);
        assert!(!config.is_production());
    }

    #[test]
    fn test_media_config_debug_redacts_secret() {
        let config = MediaStoreConfig {
            cloud_name: "test-cloud".to_string(),
            api_key: "public-key".to_string(),
            api_secret: SecretString::from("super-secret-value"),
            upload_base: "https://api.cloudinary.com".to_string(),
            folder: "bindery".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("test-cloud"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret-value"));
    }
}
