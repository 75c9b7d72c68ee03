//! Word-alignment service HTTP client.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use podclip_models::WordSpan;

use crate::error::{TranscribeError, TranscribeResult};
use crate::types::{TranscribeRequest, TranscribeResponse};

/// Configuration for the transcription client.
#[derive(Debug, Clone)]
pub struct TranscribeConfig {
    /// Base URL of the alignment service
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries
    pub max_retries: u32,
    /// Optional language hint forwarded to the service
    pub language: Option<String>,
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            timeout: Duration::from_secs(600), // long-form audio alignment
            max_retries: 2,
            language: None,
        }
    }
}

impl TranscribeConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("TRANSCRIBE_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8001".to_string()),
            timeout: Duration::from_secs(
                std::env::var("TRANSCRIBE_SERVICE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            max_retries: std::env::var("TRANSCRIBE_SERVICE_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            language: std::env::var("TRANSCRIBE_LANGUAGE").ok(),
        }
    }
}

/// Client for the word-alignment service.
pub struct TranscribeClient {
    http: Client,
    config: TranscribeConfig,
}

impl TranscribeClient {
    /// Create a new client.
    pub fn new(config: TranscribeConfig) -> TranscribeResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(TranscribeError::Network)?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> TranscribeResult<Self> {
        Self::new(TranscribeConfig::from_env())
    }

    /// Align the given audio file and return the filtered word sequence.
    ///
    /// Entries with missing timestamps, inverted bounds, or empty text are
    /// discarded here; the returned spans are all well-formed and in
    /// service order.
    pub async fn align(&self, audio_path: &Path) -> TranscribeResult<Vec<WordSpan>> {
        let url = format!("{}/align", self.config.base_url);
        let request = TranscribeRequest {
            audio_path: audio_path.to_string_lossy().to_string(),
            language: self.config.language.clone(),
        };

        debug!("Sending alignment request to {}", url);

        let response = self
            .with_retry(|| async {
                self.http
                    .post(&url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(TranscribeError::Network)
            })
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::RequestFailed(format!(
                "alignment service returned {}: {}",
                status, body
            )));
        }

        let parsed: TranscribeResponse = response.json().await?;
        let total = parsed.words.len();
        let words = filter_aligned_words(parsed);

        info!(
            words = words.len(),
            discarded = total - words.len(),
            "Transcript aligned"
        );
        Ok(words)
    }

    /// Execute with bounded exponential retry for network-class failures.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> TranscribeResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = TranscribeResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "Alignment request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(TranscribeError::RequestFailed("Unknown error".to_string())))
    }
}

/// Drop entries the pipeline cannot use: missing timestamps, inverted
/// bounds, empty text.
fn filter_aligned_words(response: TranscribeResponse) -> Vec<WordSpan> {
    response
        .words
        .into_iter()
        .filter_map(|w| match (w.start, w.end) {
            (Some(start), Some(end)) if end >= start && !w.word.trim().is_empty() => {
                Some(WordSpan::new(start, end, w.word.trim()))
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AlignedWord;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn aligned(start: Option<f64>, end: Option<f64>, word: &str) -> AlignedWord {
        AlignedWord {
            start,
            end,
            word: word.to_string(),
        }
    }

    #[test]
    fn test_filter_discards_invalid_entries() {
        let response = TranscribeResponse {
            words: vec![
                aligned(Some(0.0), Some(0.4), "hello"),
                aligned(None, Some(0.9), "missing-start"),
                aligned(Some(1.0), None, "missing-end"),
                aligned(Some(2.0), Some(1.0), "inverted"),
                aligned(Some(3.0), Some(3.5), "   "),
                aligned(Some(4.0), Some(4.5), " world "),
            ],
        };

        let words = filter_aligned_words(response);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "hello");
        assert_eq!(words[1].text, "world");
        assert_eq!(words[1].start, 4.0);
    }

    #[test]
    fn test_config_defaults() {
        let config = TranscribeConfig::default();
        assert_eq!(config.base_url, "http://localhost:8001");
        assert_eq!(config.max_retries, 2);
    }

    #[tokio::test]
    async fn test_align_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/align"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "words": [
                    {"start": 0.0, "end": 0.4, "word": "hello"},
                    {"start": null, "end": 0.9, "word": "dropped"},
                    {"start": 0.4, "end": 0.9, "word": "world"}
                ]
            })))
            .mount(&server)
            .await;

        let client = TranscribeClient::new(TranscribeConfig {
            base_url: server.uri(),
            max_retries: 0,
            ..Default::default()
        })
        .unwrap();

        let words = client.align(Path::new("/tmp/audio.wav")).await.unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "hello");
        assert_eq!(words[1].text, "world");
    }

    #[tokio::test]
    async fn test_align_server_error_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/align"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = TranscribeClient::new(TranscribeConfig {
            base_url: server.uri(),
            max_retries: 0,
            ..Default::default()
        })
        .unwrap();

        let err = client.align(Path::new("/tmp/audio.wav")).await.unwrap_err();
        assert!(matches!(err, TranscribeError::RequestFailed(_)));
    }
}
