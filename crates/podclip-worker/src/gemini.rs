//! Gemini transport for moment selection.
//!
//! Exposes a single `generate(model_id, prompt) -> text` call. Failures are
//! split into two observable classes: transient/server errors (HTTP 5xx and
//! transport failures) which the orchestrator retries within a tier, and
//! everything else (auth, bad request) which advances the tier ladder
//! immediately.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised by the LLM transport.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("LLM request rejected ({status}): {message}")]
    Request { status: u16, message: String },

    #[error("LLM network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),

    #[error("LLM configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Transient/server-class failures are retried within a model tier;
    /// everything else falls through to the next tier without retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Server { .. } | LlmError::Network(_))
    }
}

/// The `generate` boundary the orchestrator depends on.
#[async_trait]
pub trait GenerateText: Send + Sync {
    async fn generate(&self, model_id: &str, prompt: &str) -> Result<String, LlmError>;
}

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new() -> Result<Self, LlmError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| LlmError::Config("GEMINI_API_KEY not set".to_string()))?;
        Ok(Self::with_api_key(api_key))
    }

    /// Create a client with an explicit key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            client: Client::new(),
        }
    }

    /// Override the endpoint base URL (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl GenerateText for GeminiClient {
    async fn generate(&self, model_id: &str, prompt: &str) -> Result<String, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model_id, self.api_key
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        debug!(model = model_id, "Calling Gemini API");

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return if status.is_server_error() {
                Err(LlmError::Server {
                    status: status.as_u16(),
                    message,
                })
            } else {
                Err(LlmError::Request {
                    status: status.as_u16(),
                    message,
                })
            };
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("failed to parse response: {}", e)))?;

        parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| LlmError::InvalidResponse("no content in response".to_string()))
    }
}
