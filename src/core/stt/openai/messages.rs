//! Message types for OpenAI STT (Whisper) API.
//!
//! API Reference: https://platform.openai.com/docs/api-reference/audio/createTranscription

use serde::{Deserialize, Serialize};

/// Simple transcription response (json format).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscriptionResponse {
    /// The transcribed text.
    pub text: String,
}

/// OpenAI API error response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAIErrorResponse {
    pub error: OpenAIError,
}

/// OpenAI API error details.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAIError {
    /// Human-readable error message.
    pub message: String,

    /// Error type identifier.
    #[serde(rename = "type", default)]
    pub error_type: String,

    #[serde(default)]
    pub code: Option<String>,
}

impl OpenAIErrorResponse {
    /// Render a non-2xx response body, falling back to the raw text.
    pub fn describe(status: reqwest::StatusCode, body: &str) -> String {
        match serde_json::from_str::<Self>(body) {
            Ok(response) => format!(
                "OpenAI API error: {} ({})",
                response.error.message, response.error.error_type
            ),
            Err(_) => format!("OpenAI API error ({status}): {body}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_parsing() {
        let json = r#"{"error":{"message":"Invalid API key","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        let response: OpenAIErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.error.message, "Invalid API key");
        assert_eq!(response.error.code.as_deref(), Some("invalid_api_key"));
    }

    #[test]
    fn test_describe_falls_back_to_body() {
        let msg = OpenAIErrorResponse::describe(reqwest::StatusCode::BAD_GATEWAY, "upstream");
        assert!(msg.contains("502"));
        assert!(msg.contains("upstream"));
    }
}
