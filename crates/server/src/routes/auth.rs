//! Account routes: signup, login, OAuth, profile and password reset.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::Rng;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use bindery_core::{Email, Username};

use crate::db::{RepositoryError, UserRepository};
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::{User, UserProfile};
use crate::state::AppState;

const MIN_PASSWORD_LENGTH: usize = 8;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/oauth/google", post(oauth_google))
        .route("/logout", post(logout))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

#[derive(Debug, Deserialize)]
struct SignupRequest {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct OAuthRequest {
    code: String,
}

#[derive(Debug, Deserialize)]
struct ProfileUpdateRequest {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
struct ResetPasswordRequest {
    email: String,
    code: String,
    new_password: String,
}

fn session_payload(state: &AppState, user: &User, message: &str) -> Result<Value, AppError> {
    let token = state.auth().issue_token(user)?;
    Ok(json!({
        "success": true,
        "message": message,
        "token": token,
        "user": UserProfile::from(user),
    }))
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<Value>, AppError> {
    let username = Username::parse(&request.username)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let email =
        Email::parse(&request.email).map_err(|e| AppError::Validation(e.to_string()))?;
    validate_password(&request.password)?;

    let users = UserRepository::new(state.pool());
    if users.get_by_username(&username).await?.is_some() {
        return Err(AppError::Repository(RepositoryError::Conflict(
            "Username already exists".to_owned(),
        )));
    }
    if users.get_by_email(&email).await?.is_some() {
        return Err(AppError::Repository(RepositoryError::Conflict(
            "Email already exists".to_owned(),
        )));
    }

    let hash = state.auth().hash_password(&request.password)?;
    // The pre-checks above race with concurrent signups; the unique indexes
    // still map any loser to a 400 Conflict.
    let user = users.create_local(&username, &email, &hash).await?;

    info!(user_id = %user.id, "account created");
    Ok(Json(session_payload(&state, &user, "Account created")?))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let username = Username::parse(&request.username)
        .map_err(|_| crate::services::auth::AuthError::InvalidCredentials)?;

    let users = UserRepository::new(state.pool());
    let user = users
        .get_by_username(&username)
        .await?
        .ok_or(crate::services::auth::AuthError::InvalidCredentials)?;
    state.auth().verify_password(&user, &request.password)?;

    Ok(Json(session_payload(&state, &user, "Logged in")?))
}

async fn oauth_google(
    State(state): State<AppState>,
    Json(request): Json<OAuthRequest>,
) -> Result<Json<Value>, AppError> {
    let identity = state.auth().google_identity(&request.code).await?;
    let users = UserRepository::new(state.pool());

    if let Some(user) = users.get_by_google_id(&identity.google_id).await? {
        return Ok(Json(session_payload(&state, &user, "Logged in")?));
    }

    let email = Email::parse(&identity.email)
        .map_err(|e| AppError::Validation(format!("provider returned bad email: {e}")))?;

    // An existing local account with the same email gets the external
    // identity attached instead of a duplicate account.
    if let Some(user) = users.get_by_email(&email).await? {
        users.set_google_id(user.id, &identity.google_id).await?;
        return Ok(Json(session_payload(&state, &user, "Logged in")?));
    }

    let user = create_oauth_user(&users, &identity, &email).await?;
    info!(user_id = %user.id, "account created via oauth");
    Ok(Json(session_payload(&state, &user, "Account created")?))
}

/// Create an OAuth account, deriving a username from the display name or the
/// email local part and retrying with a random suffix on collision.
async fn create_oauth_user(
    users: &UserRepository<'_>,
    identity: &crate::services::auth::GoogleIdentity,
    email: &Email,
) -> Result<User, AppError> {
    let base = identity
        .name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.as_str().split('@').next().unwrap_or("reader"));
    let base = sanitize_username(base);

    for attempt in 0..3u8 {
        let candidate = if attempt == 0 {
            base.clone()
        } else {
            format!("{base}{}", rand::rng().random_range(100..10_000u32))
        };
        let Ok(username) = Username::parse(&candidate) else {
            continue;
        };
        match users
            .create_oauth(&username, email, &identity.google_id)
            .await
        {
            Ok(user) => return Ok(user),
            Err(RepositoryError::Conflict(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::Internal(
        "could not derive a free username".to_owned(),
    ))
}

fn sanitize_username(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                Some(c.to_ascii_lowercase())
            } else if c.is_whitespace() {
                Some('.')
            } else {
                None
            }
        })
        .take(Username::MAX_LENGTH - 4)
        .collect();
    if cleaned.len() < Username::MIN_LENGTH {
        format!("reader{}", rand::rng().random_range(100..10_000u32))
    } else {
        cleaned
    }
}

/// Tokens are stateless, so logout is a client-side discard; the endpoint
/// exists for the envelope's sake.
async fn logout() -> Json<Value> {
    Json(json!({ "success": true, "message": "Logged out" }))
}

async fn get_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Value>, AppError> {
    let users = UserRepository::new(state.pool());
    let user = users
        .get_by_id(current.id())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_owned()))?;
    Ok(Json(json!({
        "success": true,
        "message": "Profile",
        "user": UserProfile::from(&user),
    })))
}

async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<ProfileUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let username = request
        .username
        .as_deref()
        .map(Username::parse)
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let email = request
        .email
        .as_deref()
        .map(Email::parse)
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let users = UserRepository::new(state.pool());
    let mut user = users
        .update_profile(current.id(), username.as_ref(), email.as_ref())
        .await?;

    if let Some(password) = &request.password {
        validate_password(password)?;
        let hash = state.auth().hash_password(password)?;
        users.set_password_hash(user.id, &hash).await?;
        user.password_hash = Some(hash);
    }

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated",
        "user": UserProfile::from(&user),
    })))
}

async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    // One response shape regardless of whether the account exists, so the
    // endpoint cannot be used to enumerate emails.
    let message = "If the account exists, a reset code was issued";

    let Ok(email) = Email::parse(&request.email) else {
        return Ok(Json(json!({ "success": true, "message": message })));
    };

    let users = UserRepository::new(state.pool());
    let Some(user) = users.get_by_email(&email).await? else {
        return Ok(Json(json!({ "success": true, "message": message })));
    };

    let (code, expires_at) = state.auth().generate_reset_code();
    users.set_reset_code(user.id, &code, expires_at).await?;

    // No mail transport is wired up; the code lands in the logs and, outside
    // production, in the response for manual flows.
    info!(user_id = %user.id, reset_code = %code, "issued password reset code");
    let mut body = json!({ "success": true, "message": message });
    if !state.is_production() {
        body["reset_code"] = json!(code);
    }
    Ok(Json(body))
}

async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    let email =
        Email::parse(&request.email).map_err(|e| AppError::Validation(e.to_string()))?;
    validate_password(&request.new_password)?;

    let users = UserRepository::new(state.pool());
    let user_id = users
        .consume_reset_code(&email, &request.code)
        .await?
        .ok_or_else(|| AppError::Validation("Invalid or expired reset code".to_owned()))?;

    let hash = state.auth().hash_password(&request.new_password)?;
    users.set_password_hash(user_id, &hash).await?;

    info!(user_id = %user_id, "password reset");
    Ok(Json(json!({ "success": true, "message": "Password updated" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_collapses_display_names() {
        let name = sanitize_username("Ada Lovelace");
        assert_eq!(name, "ada.lovelace");
        assert!(Username::parse(&name).is_ok());
    }

    #[test]
    fn sanitize_drops_disallowed_characters() {
        let name = sanitize_username("Zoë @Books!");
        assert!(Username::parse(&name).is_ok(), "{name}");
    }

    #[test]
    fn sanitize_backfills_short_names() {
        let name = sanitize_username("李");
        assert!(name.starts_with("reader"));
        assert!(Username::parse(&name).is_ok());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password("seven77").is_err());
        assert!(validate_password("eight888").is_ok());
    }
}
