//! Description-service interaction: one vision-model call per image, with
//! bounded retry and exponential backoff.
//!
//! ## Failure-as-value contract
//!
//! [`describe_image`] never returns an error. Every outcome — generated
//! text, empty response, exhausted retries, malformed reply — collapses to a
//! terminal [`DescriptionStatus`], because one image's description failure
//! must not abort the batch. Callers attach the status and move on.
//!
//! ## Retry state machine
//!
//! Each call drives an explicit per-item state machine:
//!
//! ```text
//! Attempting(n) ──▶ Succeeded(text)
//!       │
//!       ├─────────▶ RetryScheduled{n+1, 2^n units} ──▶ Attempting(n+1)
//!       │
//!       └─────────▶ FailedPermanent(detail)
//! ```
//!
//! The machine lives inside the item's own future, so any number of items
//! can sit in backoff concurrently without occupying fetch/analysis workers.
//! HTTP 429/500/503 and connection-level failures (timeouts included, on
//! every attempt — the first is always retry-eligible) are transient; all
//! other outcomes are permanent. Backoff before retry `n` is
//! `retry_backoff_ms * 2^n`, i.e. 1, 2, 4, 8, 16 units for the default five
//! attempts.

use crate::config::HarvestConfig;
use crate::output::DescriptionStatus;
use crate::prompts::DEFAULT_DESCRIPTION_PROMPT;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Built-in `generateContent` endpoint used when the config carries no
/// override.
pub const DEFAULT_API_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-preview-09-2025:generateContent";

/// Terminal text for a well-formed 2xx reply that carries no usable text.
/// Permanent: retrying a response the service considered complete is
/// pointless.
pub const EMPTY_RESPONSE_MESSAGE: &str =
    "description service returned an empty or invalid response";

const CANCELLED_MESSAGE: &str = "description request cancelled";

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData<'a>>,
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    #[serde(rename = "mimeType")]
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

// ── State machine ────────────────────────────────────────────────────────

/// Per-item retry state. `Attempting` and `RetryScheduled` are the only
/// states the driver loop re-enters; the other two terminate it.
#[derive(Debug)]
enum DescribeState {
    Attempting(u32),
    RetryScheduled { next: u32, delay: Duration },
    Succeeded(String),
    FailedPermanent(String),
}

/// Classification of a single attempt, before retry budgeting.
enum AttemptOutcome {
    Success(String),
    Transient(String),
    Permanent(String),
}

/// Describe one image, returning a terminal [`DescriptionStatus`].
///
/// `encoded_payload`/`mime_type` come straight from a
/// [`crate::output::FetchedImage`]. Cancellation is honoured before each
/// attempt and before each backoff sleep.
pub async fn describe_image(
    client: &reqwest::Client,
    encoded_payload: &str,
    mime_type: &str,
    config: &HarvestConfig,
) -> DescriptionStatus {
    let prompt = config.prompt.as_deref().unwrap_or(DEFAULT_DESCRIPTION_PROMPT);
    let request = GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![
                Part {
                    text: Some(prompt),
                    inline_data: None,
                },
                Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type,
                        data: encoded_payload,
                    }),
                },
            ],
        }],
    };

    let mut state = DescribeState::Attempting(0);
    loop {
        state = match state {
            DescribeState::Attempting(attempt) => {
                if config.cancel.is_cancelled() {
                    DescribeState::FailedPermanent(CANCELLED_MESSAGE.to_string())
                } else {
                    attempt_once(client, &request, attempt, config).await
                }
            }
            DescribeState::RetryScheduled { next, delay } => {
                if config.cancel.is_cancelled() {
                    DescribeState::FailedPermanent(CANCELLED_MESSAGE.to_string())
                } else {
                    sleep(delay).await;
                    DescribeState::Attempting(next)
                }
            }
            DescribeState::Succeeded(text) => return DescriptionStatus::Done(text),
            DescribeState::FailedPermanent(detail) => return DescriptionStatus::Failed(detail),
        };
    }
}

/// Run one attempt and fold its outcome into the next state, spending the
/// retry budget on transient failures.
async fn attempt_once(
    client: &reqwest::Client,
    request: &GenerateRequest<'_>,
    attempt: u32,
    config: &HarvestConfig,
) -> DescribeState {
    match classify(client, request, config).await {
        AttemptOutcome::Success(text) => {
            debug!("Description succeeded on attempt {}", attempt + 1);
            DescribeState::Succeeded(text)
        }
        AttemptOutcome::Permanent(detail) => DescribeState::FailedPermanent(detail),
        AttemptOutcome::Transient(detail) => {
            if attempt + 1 < config.max_attempts {
                let delay = Duration::from_millis(config.retry_backoff_ms * 2u64.pow(attempt));
                warn!(
                    "Description attempt {}/{} failed ({}), retrying in {:?}",
                    attempt + 1,
                    config.max_attempts,
                    detail,
                    delay
                );
                DescribeState::RetryScheduled {
                    next: attempt + 1,
                    delay,
                }
            } else {
                DescribeState::FailedPermanent(format!(
                    "description failed after {} attempts: {}",
                    config.max_attempts, detail
                ))
            }
        }
    }
}

/// Send one request and classify the result.
async fn classify(
    client: &reqwest::Client,
    request: &GenerateRequest<'_>,
    config: &HarvestConfig,
) -> AttemptOutcome {
    let endpoint = config.api_endpoint.as_deref().unwrap_or(DEFAULT_API_ENDPOINT);
    let mut builder = client
        .post(endpoint)
        .timeout(Duration::from_secs(config.api_timeout_secs))
        .json(request);
    if let Some(key) = resolve_api_key(config) {
        builder = builder.header("x-goog-api-key", key);
    }

    let response = match builder.send().await {
        Ok(r) => r,
        // Timeouts and connection failures are transient on every attempt,
        // the first included.
        Err(e) if e.is_timeout() || e.is_connect() => {
            return AttemptOutcome::Transient(e.to_string());
        }
        Err(e) => return AttemptOutcome::Permanent(format!("description request failed: {e}")),
    };

    let status = response.status().as_u16();
    match status {
        429 | 500 | 503 => return AttemptOutcome::Transient(format!("HTTP {status}")),
        s if !(200..300).contains(&s) => {
            return AttemptOutcome::Permanent(format!("description service returned HTTP {s}"));
        }
        _ => {}
    }

    let body = match response.text().await {
        Ok(b) => b,
        Err(e) => return AttemptOutcome::Permanent(format!("failed to read response body: {e}")),
    };
    match serde_json::from_str::<GenerateResponse>(&body) {
        Ok(parsed) => match first_text(&parsed) {
            Some(text) => AttemptOutcome::Success(text),
            None => AttemptOutcome::Permanent(EMPTY_RESPONSE_MESSAGE.to_string()),
        },
        Err(e) => AttemptOutcome::Permanent(format!("unexpected response body: {e}")),
    }
}

/// Extract the first candidate's first non-empty text part.
fn first_text(response: &GenerateResponse) -> Option<String> {
    response
        .candidates
        .first()?
        .content
        .as_ref()?
        .parts
        .iter()
        .find_map(|p| {
            p.text
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
        })
}

fn resolve_api_key(config: &HarvestConfig) -> Option<String> {
    config
        .api_key
        .clone()
        .or_else(|| std::env::var("GEMINI_API_KEY").ok())
        .filter(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_matches_wire_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part {
                        text: Some("describe"),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: "image/png",
                            data: "AQID",
                        }),
                    },
                ],
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "describe"},
                        {"inlineData": {"mimeType": "image/png", "data": "AQID"}}
                    ]
                }]
            })
        );
    }

    #[test]
    fn first_text_takes_first_nonempty_part() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [{"text": "  "}, {"text": "a red bicycle"}]}
            }]
        }))
        .unwrap();
        assert_eq!(first_text(&response).as_deref(), Some("a red bicycle"));
    }

    #[test]
    fn first_text_none_for_empty_candidates() {
        let response: GenerateResponse =
            serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert_eq!(first_text(&response), None);

        let response: GenerateResponse =
            serde_json::from_value(json!({ "candidates": [{}] })).unwrap();
        assert_eq!(first_text(&response), None);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        // Delay before retry n is backoff * 2^n: 1, 2, 4, 8, 16 units.
        let base: u64 = 1000;
        let delays: Vec<u64> = (0..5).map(|n| base * 2u64.pow(n)).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000]);
    }
}
