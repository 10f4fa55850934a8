//! Auth layer errors.

use thiserror::Error;

/// Errors from password hashing, token handling and the OAuth exchange.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong username/password pair. Deliberately does not say which half.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The bearer token is missing, malformed, expired or has a bad signature.
    #[error("Invalid or expired token")]
    TokenInvalid,

    /// Signing a fresh token failed.
    #[error("token creation failed: {0}")]
    TokenCreation(jsonwebtoken::errors::Error),

    /// Argon2 hashing or hash parsing failed.
    #[error("password hashing failed: {0}")]
    Hash(String),

    /// OAuth login attempted without provider configuration.
    #[error("OAuth login is not configured")]
    OAuthDisabled,

    /// The provider rejected the code exchange or userinfo request.
    #[error("OAuth exchange failed: {0}")]
    OAuthExchange(String),

    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
