//! Flashcard generation from book PDFs via a generative-AI messages API.
//!
//! The whole PDF is sent as a base64 document block alongside a prompt that
//! pins the output to a JSON array of front/back pairs. Model output is
//! untrusted: the response is parsed defensively and rejected wholesale when
//! it is not the shape we asked for.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::FlashcardsConfig;

const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
/// Decks larger than this are truncated rather than rejected.
const MAX_CARDS: usize = 50;

const PROMPT: &str = "You are given a book as a PDF. Generate study flashcards covering its \
key concepts, characters, arguments and facts. Respond with ONLY a JSON array, no prose and \
no code fences, where each element is an object with exactly two string fields: \"front\" \
(a question or prompt) and \"back\" (the answer). Generate between 10 and 30 cards.";

/// Errors from flashcard generation.
#[derive(Debug, Error)]
pub enum FlashcardError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API rejected the request.
    #[error("generation API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The model's output was not a parseable card array.
    #[error("model output was not a flashcard array: {0}")]
    MalformedOutput(String),

    /// The model returned an empty deck.
    #[error("model returned no cards")]
    EmptyDeck,
}

/// One generated card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedCard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
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
    config: FlashcardsConfig,
    client: reqwest::Client,
}

/// Client for the messages API. Cheap to clone.
#[derive(Clone)]
pub struct FlashcardClient {
    inner: Arc<Inner>,
}

impl FlashcardClient {
    /// Create a client from configuration.
    #[must_use]
    pub fn new(config: FlashcardsConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                client: reqwest::Client::new(),
            }),
        }
    }

    /// Generate a deck of cards from PDF bytes.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardError::Api` when the API rejects the request and
    /// `FlashcardError::MalformedOutput`/`EmptyDeck` when the model's answer
    /// cannot be used.
    #[instrument(skip(self, pdf_bytes), fields(pdf_len = pdf_bytes.len()))]
    pub async fn generate(&self, pdf_bytes: &[u8]) -> Result<Vec<GeneratedCard>, FlashcardError> {
        let config = &self.inner.config;
        let body = json!({
            "model": config.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "document",
                        "source": {
                            "type": "base64",
                            "media_type": "application/pdf",
                            "data": BASE64.encode(pdf_bytes),
                        },
                    },
                    { "type": "text", "text": PROMPT },
                ],
            }],
        });

        let endpoint = format!("{}/v1/messages", config.api_base);
        let response = self
            .inner
            .client
            .post(&endpoint)
            .header("x-api-key", config.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .map_or_else(|_| "unknown error".to_owned(), |body| body.error.message);
            return Err(FlashcardError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();

        let cards = parse_cards(&text)?;
        info!(cards = cards.len(), "generated flashcard deck");
        Ok(cards)
    }
}

/// Parse the model's text into cards, tolerating code fences and truncating
/// oversized decks.
fn parse_cards(text: &str) -> Result<Vec<GeneratedCard>, FlashcardError> {
    let trimmed = strip_code_fence(text.trim());
    let mut cards: Vec<GeneratedCard> = serde_json::from_str(trimmed)
        .map_err(|e| FlashcardError::MalformedOutput(e.to_string()))?;

    cards.retain(|card| !card.front.trim().is_empty() && !card.back.trim().is_empty());
    if cards.is_empty() {
        return Err(FlashcardError::EmptyDeck);
    }
    if cards.len() > MAX_CARDS {
        warn!(cards = cards.len(), "truncating oversized deck");
        cards.truncate(MAX_CARDS);
    }
    Ok(cards)
}

/// Models sometimes fence JSON despite instructions; unwrap one fence layer.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches('\n')
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}
