//! Integration tests for Bindery.
//!
//! # Running Tests
//!
//! All tests here are `#[ignore]`d end-to-end API tests and require:
//! - A running `PostgreSQL` database with migrations applied
//!   (`cargo run -p bindery-cli -- migrate`)
//! - The server running (`cargo run -p bindery-server`)
//!
//! ```bash
//! cargo test -p bindery-integration-tests -- --ignored
//! ```
//!
//! The server base URL is configurable via `BINDERY_BASE_URL`
//! (default `http://localhost:4000`).

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("BINDERY_BASE_URL").unwrap_or_else(|_| "http://localhost:4000".to_string())
}
