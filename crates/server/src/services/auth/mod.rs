//! Authentication: Argon2 password hashing, JWT bearer tokens, the Google
//! OAuth code exchange and password-reset codes.

pub mod error;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bindery_core::UserId;

use crate::config::GoogleOAuthConfig;
use crate::models::User;

pub use error::AuthError;

/// Bearer token lifetime.
const TOKEN_TTL_HOURS: i64 = 24 * 7;
/// How long a password-reset code stays valid.
pub const RESET_CODE_TTL_MINUTES: i64 = 15;

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// JWT payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Owning user's ID.
    pub sub: i32,
    /// Username at issue time, for logging only; never trusted for lookups.
    pub username: String,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

impl Claims {
    /// The authenticated user's ID.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        UserId::new(self.sub)
    }
}

/// Identity facts returned by the OAuth provider.
#[derive(Debug, Clone)]
pub struct GoogleIdentity {
    /// Provider-scoped stable user ID.
    pub google_id: String,
    /// Verified email address.
    pub email: String,
    /// Display name, used to derive a username for new accounts.
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    id: String,
    email: String,
    name: Option<String>,
}

/// Stateless authentication service. Cheap to clone is not needed here; it
/// lives inside the shared application state.
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    google: Option<GoogleOAuthConfig>,
    client: reqwest::Client,
}

impl AuthService {
    /// Build the service from the signing secret and optional OAuth config.
    #[must_use]
    pub fn new(jwt_secret: &SecretString, google: Option<GoogleOAuthConfig>) -> Self {
        let secret = jwt_secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            google,
            client: reqwest::Client::new(),
        }
    }

    /// Hash a password with Argon2id and a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Hash` if hashing fails.
    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::Hash(e.to_string()))
    }

    /// Verify a password against a stored hash.
    ///
    /// An account without a hash (OAuth-only) never verifies; callers get the
    /// same `InvalidCredentials` as for a wrong password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on mismatch, `AuthError::Hash`
    /// if the stored hash is unparseable.
    pub fn verify_password(&self, user: &User, password: &str) -> Result<(), AuthError> {
        let Some(hash) = user.password_hash.as_deref() else {
            return Err(AuthError::InvalidCredentials);
        };
        let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hash(e.to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    /// Issue a signed bearer token for a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenCreation` if signing fails.
    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.as_i32(),
            username: user.username.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(AuthError::TokenCreation)
    }

    /// Decode and validate a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenInvalid` for any decode/validation failure.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AuthError::TokenInvalid)
    }

    /// Generate a 6-digit password-reset code and its expiry.
    #[must_use]
    pub fn generate_reset_code(&self) -> (String, DateTime<Utc>) {
        let code = format!("{:06}", rand::rng().random_range(0..1_000_000u32));
        (code, Utc::now() + Duration::minutes(RESET_CODE_TTL_MINUTES))
    }

    /// Whether OAuth login is configured.
    #[must_use]
    pub const fn oauth_enabled(&self) -> bool {
        self.google.is_some()
    }

    /// Exchange an OAuth authorization code for the user's identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::OAuthDisabled` without provider configuration and
    /// `AuthError::OAuthExchange` when the provider rejects either request.
    #[instrument(skip(self, code))]
    pub async fn google_identity(&self, code: &str) -> Result<GoogleIdentity, AuthError> {
        let google = self.google.as_ref().ok_or(AuthError::OAuthDisabled)?;

        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", google.client_id.as_str()),
                ("client_secret", google.client_secret.expose_secret()),
                ("redirect_uri", google.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AuthError::OAuthExchange(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }
        let exchange: TokenExchangeResponse = response.json().await?;

        let response = self
            .client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&exchange.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AuthError::OAuthExchange(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }
        let info: UserInfoResponse = response.json().await?;

        Ok(GoogleIdentity {
            google_id: info.id,
            email: info.email,
            name: info.name,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bindery_core::{Email, Username};

    use super::*;

    fn test_service() -> AuthService {
        AuthService::new(&SecretString::from("k9#mP2$vL8@qR5!wX3^zC7&nF0*jH4%t"), None)
    }

    fn test_user(password_hash: Option<String>) -> User {
        User {
            id: UserId::new(7),
            username: Username::parse("reader").unwrap(),
            email: Email::parse("reader@example.com").unwrap(),
            password_hash,
            google_id: None,
            reset_code: None,
            reset_code_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn hash_then_verify_roundtrip() {
        let svc = test_service();
        let hash = svc.hash_password("correct horse").unwrap();
        let user = test_user(Some(hash));

        assert!(svc.verify_password(&user, "correct horse").is_ok());
        assert!(matches!(
            svc.verify_password(&user, "wrong horse"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn hashes_are_salted() {
        let svc = test_service();
        let a = svc.hash_password("same").unwrap();
        let b = svc.hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn oauth_only_account_never_verifies() {
        let svc = test_service();
        let user = test_user(None);
        assert!(matches!(
            svc.verify_password(&user, "anything"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn token_roundtrip_carries_user_id() {
        let svc = test_service();
        let user = test_user(None);
        let token = svc.issue_token(&user).unwrap();

        let claims = svc.verify_token(&token).unwrap();
        assert_eq!(claims.user_id(), UserId::new(7));
        assert_eq!(claims.username, "reader");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let svc = test_service();
        let other =
            AuthService::new(&SecretString::from("z1!aQ9@bW8#cE7$dR6%fT5^gY4&hU3*j"), None);
        let token = other.issue_token(&test_user(None)).unwrap();

        assert!(matches!(
            svc.verify_token(&token),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let svc = test_service();
        assert!(matches!(
            svc.verify_token("not.a.token"),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[test]
    fn reset_code_is_six_digits_with_future_expiry() {
        let svc = test_service();
        let (code, expires_at) = svc.generate_reset_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
        assert!(expires_at > Utc::now());
    }

    #[tokio::test]
    async fn oauth_without_config_is_disabled() {
        let svc = test_service();
        assert!(!svc.oauth_enabled());
        assert!(matches!(
            svc.google_identity("code").await,
            Err(AuthError::OAuthDisabled)
        ));
    }
}
