//! Moment-selection orchestrator.
//!
//! Drives the LLM transport across an ordered model tier ladder: each tier
//! gets a bounded number of attempts with a fixed retry delay for transient
//! failures, non-transient failures advance the ladder immediately, and
//! exhausting every tier surfaces the last observed error.
//!
//! Selection failure on the content level (unparseable or non-array output)
//! degrades to an empty moment list: zero usable moments is a valid,
//! expected outcome, not a fault.

use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use podclip_models::{Moment, WordSpan, MAX_CLIP_SECS, MIN_CLIP_SECS};

use crate::gemini::{GenerateText, LlmError};

/// Default model tier ladder, highest-capability first.
pub const DEFAULT_MODEL_TIERS: &[&str] = &[
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
];

/// Default attempts per tier.
pub const DEFAULT_MAX_RETRIES_PER_MODEL: u32 = 3;

/// Default delay between attempts within a tier.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Orchestrates moment selection over a model tier ladder.
pub struct MomentSelector<C> {
    client: C,
    tiers: Vec<String>,
    max_retries_per_model: u32,
    retry_delay: Duration,
}

impl<C: GenerateText> MomentSelector<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            tiers: DEFAULT_MODEL_TIERS.iter().map(|s| s.to_string()).collect(),
            max_retries_per_model: DEFAULT_MAX_RETRIES_PER_MODEL,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Replace the model tier ladder.
    pub fn with_tiers(mut self, tiers: Vec<String>) -> Self {
        self.tiers = tiers;
        self
    }

    /// Set attempts per tier.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries_per_model = max_retries;
        self
    }

    /// Set the fixed delay between attempts within a tier.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Select candidate clip moments for the given topic.
    ///
    /// Returns moments in model order, untruncated; the caller applies the
    /// clip-count limit.
    pub async fn select_moments(
        &self,
        transcript: &[WordSpan],
        topic_prompt: &str,
    ) -> Result<Vec<Moment>, LlmError> {
        let prompt = build_prompt(transcript, topic_prompt);
        let mut last_error: Option<LlmError> = None;

        for tier in &self.tiers {
            for attempt in 1..=self.max_retries_per_model {
                match self.client.generate(tier, &prompt).await {
                    Ok(text) => {
                        let moments = parse_moments(&text).into_moments();
                        info!(
                            model = %tier,
                            moments = moments.len(),
                            "Moment selection complete"
                        );
                        return Ok(moments);
                    }
                    Err(e) if e.is_transient() => {
                        warn!(
                            model = %tier,
                            attempt,
                            max_attempts = self.max_retries_per_model,
                            error = %e,
                            "Transient moment-selection failure"
                        );
                        let retry = attempt < self.max_retries_per_model;
                        last_error = Some(e);
                        if retry {
                            tokio::time::sleep(self.retry_delay).await;
                        }
                    }
                    Err(e) => {
                        warn!(
                            model = %tier,
                            error = %e,
                            "Non-retryable failure, advancing to next tier"
                        );
                        last_error = Some(e);
                        break;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Config("no model tiers configured".to_string())))
    }
}

/// Build the selection prompt: topic, constraints, and the full transcript
/// as word/start/end records.
fn build_prompt(transcript: &[WordSpan], topic_prompt: &str) -> String {
    let transcript_json =
        serde_json::to_string(transcript).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"This is a podcast video transcript consisting of words, along with each word's start and end time. I am looking to create clips based on a specific topic provided by the user.

The user is specifically interested in moments related to: "{topic}"

Your task is to find and extract segments from the transcript that are relevant to the user's topic. These segments could be stories, discussions, questions and answers, or significant mentions related to the topic.

Each extracted clip must adhere strictly to the following rules:
- The content must be directly relevant to the user's topic: "{topic}".
- Clip duration must be between a minimum of {min} seconds and a maximum of {max} seconds. Clips must never exceed {max} seconds.
- Ensure that clips do not overlap with one another.
- Start and end timestamps of the clips must align perfectly with the word boundaries in the transcript provided. Only use the start and end timestamps provided in the input; modifying timestamps is not allowed.
- Format the output STRICTLY as a JSON array of objects, each representing a clip with 'start' and 'end' timestamps in seconds: [{{"start": seconds, "end": seconds}}, ...]. The output must be valid JSON.

Avoid including:
- Moments of greeting, thanking, or saying goodbye unless directly relevant to the user's topic.
- Segments that are irrelevant to the user's topic.

If there are no valid clips relevant to the topic that meet all the criteria (especially duration), the output must be an empty JSON array [].

The transcript is as follows:

{transcript}"#,
        topic = topic_prompt,
        min = MIN_CLIP_SECS as u32,
        max = MAX_CLIP_SECS as u32,
        transcript = transcript_json,
    )
}

/// The model's output, classified.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParsedMoments {
    /// A non-empty list of usable moments.
    Valid(Vec<Moment>),
    /// A parseable but empty result.
    Empty,
    /// Unparseable or non-array output.
    Malformed,
}

impl ParsedMoments {
    /// Collapse the non-valid cases to an empty list so downstream code is
    /// total over all model outputs.
    pub(crate) fn into_moments(self) -> Vec<Moment> {
        match self {
            ParsedMoments::Valid(moments) => moments,
            ParsedMoments::Empty | ParsedMoments::Malformed => Vec::new(),
        }
    }
}

/// Parse the model's response into moments.
pub(crate) fn parse_moments(text: &str) -> ParsedMoments {
    let cleaned = strip_code_fence(text.trim());

    let value: Value = match serde_json::from_str(cleaned) {
        Ok(value) => value,
        Err(_) => return ParsedMoments::Malformed,
    };

    let Value::Array(items) = value else {
        return ParsedMoments::Malformed;
    };

    let moments: Vec<Moment> = items
        .iter()
        .filter_map(|item| {
            let start = item.get("start")?.as_f64()?;
            let end = item.get("end")?.as_f64()?;
            Some(Moment::new(start, end))
        })
        .collect();

    if moments.is_empty() {
        ParsedMoments::Empty
    } else {
        ParsedMoments::Valid(moments)
    }
}

/// Strip a fenced code block wrapper if the model added one.
fn strip_code_fence(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest.trim_start();
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest.trim_start();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    text
}
