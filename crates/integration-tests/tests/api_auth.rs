//! End-to-end tests for the account endpoints.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (cargo run -p bindery-server)
//!
//! Run with: cargo test -p bindery-integration-tests -- --ignored

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use bindery_integration_tests::base_url;

/// A username that cannot collide across test runs.
fn unique_username(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{prefix}{nanos}")
}

async fn signup(client: &Client, username: &str, password: &str) -> (StatusCode, Value) {
    let resp = client
        .post(format!("{}/api/auth/signup", base_url()))
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": password,
        }))
        .send()
        .await
        .expect("signup request failed");
    let status = resp.status();
    let body: Value = resp.json().await.expect("non-JSON signup response");
    (status, body)
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn signup_then_login_roundtrip() {
    let client = Client::new();
    let username = unique_username("reader");

    let (status, body) = signup(&client, &username, "correct horse battery").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(body["token"].is_string());

    let resp = client
        .post(format!("{}/api/auth/login", base_url()))
        .json(&json!({ "username": username, "password": "correct horse battery" }))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn duplicate_username_is_a_400_with_message() {
    let client = Client::new();
    let username = unique_username("dupe");

    let (status, _) = signup(&client, &username, "correct horse battery").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = signup(&client, &username, "correct horse battery").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Username already exists"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn wrong_password_is_a_401() {
    let client = Client::new();
    let username = unique_username("locked");

    let (status, _) = signup(&client, &username, "correct horse battery").await;
    assert_eq!(status, StatusCode::OK);

    let resp = client
        .post(format!("{}/api/auth/login", base_url()))
        .json(&json!({ "username": username, "password": "wrong horse" }))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn profile_requires_a_token() {
    let client = Client::new();
    let resp = client
        .get(format!("{}/api/auth/profile", base_url()))
        .send()
        .await
        .expect("profile request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn token_works_from_a_cookie_too() {
    let client = Client::new();
    let username = unique_username("cookie");

    let (_, body) = signup(&client, &username, "correct horse battery").await;
    let token = body["token"].as_str().expect("token missing").to_owned();

    let resp = client
        .get(format!("{}/api/auth/profile", base_url()))
        .header("cookie", format!("token={token}"))
        .send()
        .await
        .expect("profile request failed");
    assert_eq!(resp.status(), StatusCode::OK);
}
