//! Stripe checkout integration.
//!
//! Talks to the Checkout Sessions API directly over form-encoded HTTP. The
//! flow is create-session at checkout time, then verify the session's
//! `payment_status` when the success redirect lands before recording the
//! purchase.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::StripeConfig;
use crate::models::CartItem;

/// Errors from the payment provider integration.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the request.
    #[error("payment provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// A cart price does not convert to whole cents.
    #[error("invalid amount for '{title}'")]
    InvalidAmount { title: String },

    /// Checkout attempted with an empty cart.
    #[error("cart is empty")]
    EmptyCart,
}

/// A created checkout session: the ID is persisted as the payment reference,
/// the URL is where the client redirects the buyer.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Session state as reported by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionStatus {
    pub id: String,
    pub payment_status: String,
}

impl SessionStatus {
    /// Whether the buyer completed payment.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ApiErrorMessage {
    message: String,
}

struct Inner {
    config: StripeConfig,
    client: reqwest::Client,
}

/// Client for the checkout API. Cheap to clone.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<Inner>,
}

impl StripeClient {
    /// Create a client from configuration.
    #[must_use]
    pub fn new(config: StripeConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                client: reqwest::Client::new(),
            }),
        }
    }

    /// Create a checkout session for the cart.
    ///
    /// Line items carry inline `price_data` in integer cents; no catalog
    /// objects are registered with the provider.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::EmptyCart` for an empty cart,
    /// `PaymentError::InvalidAmount` when a price does not fit whole cents,
    /// and `PaymentError::Api` when the provider rejects the request.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn create_checkout_session(
        &self,
        items: &[CartItem],
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        if items.is_empty() {
            return Err(PaymentError::EmptyCart);
        }

        let mut params = vec![
            ("mode".to_owned(), "payment".to_owned()),
            ("success_url".to_owned(), success_url.to_owned()),
            ("cancel_url".to_owned(), cancel_url.to_owned()),
        ];
        params.extend(line_item_params(items)?);

        let endpoint = format!("{}/v1/checkout/sessions", self.inner.config.api_base);
        let response = self
            .inner
            .client
            .post(&endpoint)
            .bearer_auth(self.inner.config.secret_key.expose_secret())
            .form(&params)
            .send()
            .await?;

        let session: CheckoutSession = Self::parse_response(response).await?;
        info!(session_id = %session.id, "created checkout session");
        Ok(session)
    }

    /// Retrieve a session to check its payment status.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Api` when the provider rejects the request,
    /// including for unknown session IDs.
    #[instrument(skip(self))]
    pub async fn retrieve_session(&self, session_id: &str) -> Result<SessionStatus, PaymentError> {
        let endpoint = format!(
            "{}/v1/checkout/sessions/{session_id}",
            self.inner.config.api_base
        );
        let response = self
            .inner
            .client
            .get(&endpoint)
            .bearer_auth(self.inner.config.secret_key.expose_secret())
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .map_or_else(|_| "unknown error".to_owned(), |body| body.error.message);
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

/// Flatten cart items into the provider's indexed form parameters.
fn line_item_params(items: &[CartItem]) -> Result<Vec<(String, String)>, PaymentError> {
    let mut params = Vec::with_capacity(items.len() * 4);
    for (i, item) in items.iter().enumerate() {
        let cents = item.price.as_cents().ok_or_else(|| PaymentError::InvalidAmount {
            title: item.title.clone(),
        })?;
        params.push((
            format!("line_items[{i}][price_data][currency]"),
            "usd".to_owned(),
        ));
        params.push((
            format!("line_items[{i}][price_data][product_data][name]"),
            format!("{} by {}", item.title, item.author),
        ));
        params.push((
            format!("line_items[{i}][price_data][unit_amount]"),
            cents.to_string(),
        ));
        params.push((
            format!("line_items[{i}][quantity]"),
            item.quantity.to_string(),
        ));
    }
    Ok(params)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::Router;
    use axum::routing::{get, post};
    use chrono::Utc;
    use secrecy::SecretString;

    use bindery_core::{BookId, Price, UserId};

    use super::*;

    fn item(title: &str, cents: i64, quantity: i32) -> CartItem {
        CartItem {
            user_id: UserId::new(1),
            book_id: BookId::new(2),
            title: title.to_owned(),
            author: "Author".to_owned(),
            cover_url: None,
            price: Price::from_cents(cents),
            quantity,
            added_at: Utc::now(),
        }
    }

    async fn spawn_upstream(router: Router) -> StripeClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        StripeClient::new(StripeConfig {
            secret_key: SecretString::from("sk_test_key"),
            api_base: format!("http://{addr}"),
        })
    }

    #[test]
    fn line_items_are_indexed_in_cents() {
        let params = line_item_params(&[item("Dune", 1999, 1), item("Hyperion", 1450, 2)]).unwrap();

        assert!(params.contains(&(
            "line_items[0][price_data][unit_amount]".to_owned(),
            "1999".to_owned()
        )));
        assert!(params.contains(&(
            "line_items[1][price_data][unit_amount]".to_owned(),
            "1450".to_owned()
        )));
        assert!(params.contains(&("line_items[1][quantity]".to_owned(), "2".to_owned())));
    }

    #[test]
    fn empty_cart_is_rejected() {
        let client = StripeClient::new(StripeConfig {
            secret_key: SecretString::from("sk_test_key"),
            api_base: "http://unused".to_owned(),
        });
        let rt = tokio::runtime::Runtime::new().unwrap();
        let err = rt
            .block_on(client.create_checkout_session(&[], "http://s", "http://c"))
            .unwrap_err();
        assert!(matches!(err, PaymentError::EmptyCart));
    }

    #[tokio::test]
    async fn create_session_parses_provider_response() {
        let client = spawn_upstream(Router::new().route(
            "/v1/checkout/sessions",
            post(|| async {
                axum::Json(serde_json::json!({
                    "id": "cs_test_123",
                    "url": "https://checkout.example.com/pay/cs_test_123",
                }))
            }),
        ))
        .await;

        let session = client
            .create_checkout_session(&[item("Dune", 1999, 1)], "http://s", "http://c")
            .await
            .unwrap();
        assert_eq!(session.id, "cs_test_123");
    }

    #[tokio::test]
    async fn paid_session_verifies() {
        let client = spawn_upstream(Router::new().route(
            "/v1/checkout/sessions/{id}",
            get(|| async {
                axum::Json(serde_json::json!({
                    "id": "cs_test_123",
                    "payment_status": "paid",
                }))
            }),
        ))
        .await;

        let status = client.retrieve_session("cs_test_123").await.unwrap();
        assert!(status.is_paid());
    }

    #[tokio::test]
    async fn provider_error_carries_message() {
        let client = spawn_upstream(Router::new().route(
            "/v1/checkout/sessions/{id}",
            get(|| async {
                (
                    axum::http::StatusCode::NOT_FOUND,
                    axum::Json(serde_json::json!({
                        "error": { "message": "No such checkout session" }
                    })),
                )
            }),
        ))
        .await;

        let err = client.retrieve_session("cs_missing").await.unwrap_err();
        match err {
            PaymentError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "No such checkout session");
            }
            other => panic!("expected Api error, got {other}"),
        }
    }
}
