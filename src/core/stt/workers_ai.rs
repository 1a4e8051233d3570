//! Cloudflare Workers AI Whisper transcription.
//!
//! The audio chunk is posted as the raw request body; the model decodes the
//! container itself, so no WAV wrapping is needed.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::base::{BaseSTT, STTConfig, STTError};
use crate::core::cloudflare::{self, Envelope};

/// Default Workers AI speech recognition model
pub const DEFAULT_WORKERS_AI_STT_MODEL: &str = "@cf/openai/whisper-tiny-en";

#[derive(Debug, Deserialize)]
struct WhisperResult {
    #[serde(default)]
    text: String,
}

/// Workers AI Whisper client
pub struct WorkersAiSTT {
    http_client: Client,
    url: String,
    api_token: String,
}

impl WorkersAiSTT {
    pub fn new(config: STTConfig) -> Result<Self, STTError> {
        let account_id = config
            .account_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                STTError::ConfigurationError("Workers AI account id is required".to_string())
            })?;
        if config.api_key.is_empty() {
            return Err(STTError::ConfigurationError(
                "Workers AI API token is required".to_string(),
            ));
        }

        let model = if config.model.is_empty() {
            DEFAULT_WORKERS_AI_STT_MODEL
        } else {
            config.model.as_str()
        };

        let http_client = Client::builder()
            .pool_max_idle_per_host(4)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                STTError::ConfigurationError(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            http_client,
            url: cloudflare::run_url(config.base_url.as_deref(), account_id, model),
            api_token: config.api_key,
        })
    }
}

#[async_trait]
impl BaseSTT for WorkersAiSTT {
    async fn transcribe(&self, audio: Bytes) -> Result<String, STTError> {
        if audio.is_empty() {
            return Err(STTError::AudioProcessingError(
                "Audio chunk is empty".to_string(),
            ));
        }

        debug!(bytes = audio.len(), "Sending audio to Workers AI Whisper");

        let response = self
            .http_client
            .post(&self.url)
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/octet-stream")
            .body(audio)
            .send()
            .await
            .map_err(|e| STTError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| STTError::NetworkError(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = cloudflare::describe_failure(status, &body);
            return Err(if status.as_u16() == 401 || status.as_u16() == 403 {
                STTError::AuthenticationFailed(message)
            } else {
                STTError::ProviderError(message)
            });
        }

        let envelope: Envelope<WhisperResult> = serde_json::from_str(&body).map_err(|e| {
            STTError::ProviderError(format!("Malformed transcription response: {e}"))
        })?;
        let result = envelope.into_result().map_err(STTError::ProviderError)?;

        let text = result.text.trim().to_string();
        info!(chars = text.len(), "Workers AI transcription complete");
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "workers-ai"
    }
}
