//! Shared plumbing for the Cloudflare Workers AI REST API.
//!
//! Every Workers AI model is invoked through the same endpoint shape:
//!
//! ```text
//! POST {base}/accounts/{account_id}/ai/run/{model}
//! Authorization: Bearer {api_token}
//! ```
//!
//! Non-streaming responses are wrapped in a `{success, result, errors}`
//! envelope, which [`Envelope::into_result`] unwraps.

use serde::Deserialize;

/// Default Workers AI REST base URL
pub const WORKERS_AI_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Build the run URL for a model.
///
/// Model identifiers such as `@cf/meta/llama-3.1-8b-instruct` are used
/// verbatim as path segments.
pub fn run_url(base_url: Option<&str>, account_id: &str, model: &str) -> String {
    let base = base_url.unwrap_or(WORKERS_AI_BASE_URL).trim_end_matches('/');
    format!("{base}/accounts/{account_id}/ai/run/{model}")
}

/// Error/message entry in a Workers AI envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

/// Standard Workers AI response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    pub result: Option<T>,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
}

impl<T> Envelope<T> {
    /// Unwrap the `result` field, turning `success: false` or a missing
    /// result into a readable error message.
    pub fn into_result(self) -> Result<T, String> {
        if self.success == Some(false) || self.result.is_none() {
            let detail = self
                .errors
                .iter()
                .map(|e| match e.code {
                    Some(code) => format!("{} ({code})", e.message),
                    None => e.message.clone(),
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(if detail.is_empty() {
                "Workers AI returned no result".to_string()
            } else {
                format!("Workers AI error: {detail}")
            });
        }
        self.result
            .ok_or_else(|| "Workers AI returned no result".to_string())
    }
}

/// Extract a readable message from a non-2xx response body.
pub fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<Envelope<serde_json::Value>>(body)
        && let Err(message) = envelope.into_result()
    {
        return format!("{message} (HTTP {status})");
    }
    format!("Workers AI request failed ({status}): {body}")
}
