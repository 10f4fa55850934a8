//! Bearer-token authentication extractor.
//!
//! Handlers take [`CurrentUser`] as an argument to require a valid token.
//! The token is read from the `Authorization: Bearer` header first, then from
//! the `token`, `jwt` or `access_token` cookies for browser clients that hold
//! the token in a cookie instead of a header.

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;

use bindery_core::UserId;

use crate::error::AppError;
use crate::services::auth::{AuthError, Claims};
use crate::state::AppState;

/// Cookie names accepted as token carriers, in lookup order.
const TOKEN_COOKIES: &[&str] = &["token", "jwt", "access_token"];

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub claims: Claims,
}

impl CurrentUser {
    /// The caller's user ID.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.claims.user_id()
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            extract_token(parts).ok_or(AppError::Auth(AuthError::TokenInvalid))?;
        let claims = state.auth().verify_token(&token)?;
        Ok(Self { claims })
    }
}

fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(value) = parts.headers.get(AUTHORIZATION)
        && let Ok(value) = value.to_str()
        && let Some(token) = value.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_owned());
    }

    let cookies = parts.headers.get(COOKIE)?.to_str().ok()?;
    for name in TOKEN_COOKIES {
        if let Some(token) = cookie_value(cookies, name) {
            return Some(token);
        }
    }
    None
}

/// Find a cookie's value in a raw `Cookie` header.
fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name && !v.is_empty()).then(|| v.to_owned())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(header: &str, value: &str) -> Parts {
        let request = Request::builder()
            .uri("/api/cart")
            .header(header, value)
            .body(())
            .unwrap();
        request.into_parts().0
    }

    #[test]
    fn bearer_header_wins() {
        let parts = parts_with("authorization", "Bearer abc.def.ghi");
        assert_eq!(extract_token(&parts).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn falls_back_to_token_cookie() {
        let parts = parts_with("cookie", "theme=dark; token=abc.def.ghi; lang=en");
        assert_eq!(extract_token(&parts).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn accepts_alternate_cookie_names() {
        for name in ["jwt", "access_token"] {
            let parts = parts_with("cookie", &format!("{name}=x.y.z"));
            assert_eq!(extract_token(&parts).unwrap(), "x.y.z", "{name}");
        }
    }

    #[test]
    fn empty_cookie_value_is_ignored() {
        let parts = parts_with("cookie", "token=; jwt=x.y.z");
        assert_eq!(extract_token(&parts).unwrap(), "x.y.z");
    }

    #[test]
    fn no_credentials_yields_none() {
        let request = Request::builder().uri("/api/cart").body(()).unwrap();
        assert!(extract_token(&request.into_parts().0).is_none());
    }
}
