//! End-to-end tests for the catalog and cart endpoints.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (cargo run -p bindery-server)
//!
//! Run with: cargo test -p bindery-integration-tests -- --ignored

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use bindery_integration_tests::base_url;

fn unique_username(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{prefix}{nanos}")
}

/// Sign up a throwaway user and return a bearer token.
async fn bearer_token(client: &Client) -> String {
    let username = unique_username("cart");
    let resp = client
        .post(format!("{}/api/auth/signup", base_url()))
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "correct horse battery",
        }))
        .send()
        .await
        .expect("signup request failed");
    let body: Value = resp.json().await.expect("non-JSON signup response");
    body["token"].as_str().expect("token missing").to_owned()
}

/// Create a catalog book and return its id.
async fn create_book(client: &Client, token: &str, bestseller: bool) -> i64 {
    let data = json!({
        "title": format!("Test Book {}", unique_username("t")),
        "author": "Integration Author",
        "price": "19.99",
        "is_bestseller": bestseller,
    });
    let form = reqwest::multipart::Form::new().text("data", data.to_string());
    let resp = client
        .post(format!("{}/api/books", base_url()))
        .bearer_auth(token)
        .multipart(form)
        .send()
        .await
        .expect("create book failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("non-JSON book response");
    body["book"]["id"].as_i64().expect("book id missing")
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn bestseller_filter_returns_only_bestsellers() {
    let client = Client::new();
    let token = bearer_token(&client).await;

    create_book(&client, &token, true).await;
    create_book(&client, &token, false).await;

    let resp = client
        .get(format!("{}/api/books?bestseller=true", base_url()))
        .send()
        .await
        .expect("list request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("non-JSON list response");
    let books = body["books"].as_array().expect("books missing");
    assert!(!books.is_empty());
    for book in books {
        assert_eq!(book["is_bestseller"], json!(true), "{book}");
    }
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn duplicate_cart_add_is_a_noop() {
    let client = Client::new();
    let token = bearer_token(&client).await;
    let book_id = create_book(&client, &token, false).await;

    for expected in ["Book added to cart", "Book already in cart"] {
        let resp = client
            .post(format!("{}/api/cart/add", base_url()))
            .bearer_auth(&token)
            .json(&json!({ "book_id": book_id }))
            .send()
            .await
            .expect("cart add failed");
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.expect("non-JSON cart response");
        assert_eq!(body["message"], json!(expected));
    }

    let resp = client
        .get(format!("{}/api/cart", base_url()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("cart list failed");
    let body: Value = resp.json().await.expect("non-JSON cart response");
    let items = body["items"].as_array().expect("items missing");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], json!(1));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn missing_book_is_a_404_envelope() {
    let client = Client::new();
    let resp = client
        .get(format!("{}/api/books/999999999", base_url()))
        .send()
        .await
        .expect("get request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = resp.json().await.expect("non-JSON response");
    assert_eq!(body["success"], json!(false));
}
