//! Client for the third-party generative-language API.
//!
//! The service relays an opaque prompt with the caller's own API key and hands
//! back the first text part of the first candidate. Prompt construction and
//! interpretation of the answer belong to callers.

use anyhow::{Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{Instrument, info_span};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const API_KEY_HEADER: &str = "x-goog-api-key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("upstream returned no text")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn into_first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|part| part.text)
    }
}

#[derive(Debug, Clone)]
pub struct AiClient {
    client: Client,
    endpoint: Url,
    model: String,
}

impl AiClient {
    /// Build a client for `model` served under `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        let base = if base_url.ends_with('/') {
            Url::parse(base_url)
        } else {
            Url::parse(&format!("{base_url}/"))
        }
        .with_context(|| format!("invalid AI base URL: {base_url}"))?;

        let endpoint = base
            .join(&format!("v1beta/models/{model}:generateContent"))
            .with_context(|| format!("invalid AI model name: {model}"))?;

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Error creating reqwest client")?;

        Ok(Self {
            client,
            endpoint,
            model: model.to_string(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` using the caller's `api_key` and return the generated text.
    ///
    /// # Errors
    /// Returns `AiError` on transport failure, a non-success status, or an
    /// answer without text.
    pub async fn generate(&self, api_key: &SecretString, prompt: &str) -> Result<String, AiError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let span = info_span!("ai.generate", ai.model = %self.model);
        async {
            let response = self
                .client
                .post(self.endpoint.clone())
                .header(API_KEY_HEADER, api_key.expose_secret())
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(AiError::Status(status.as_u16()));
            }

            let payload: GenerateContentResponse = response.json().await?;
            payload.into_first_text().ok_or(AiError::Empty)
        }
        .instrument(span)
        .await
    }
}
