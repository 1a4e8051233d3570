//! Cloudflare Workers AI MeloTTS synthesis.
//!
//! The model answers with a JSON envelope whose `result.audio` field holds a
//! base64-encoded MP3 clip; it is decoded here so every `BaseTTS`
//! implementation hands raw audio bytes to the caller.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::base::{BaseTTS, TTSConfig, TTSError, TTSResult};
use crate::core::cloudflare::{self, Envelope};

/// Default Workers AI speech synthesis model
pub const DEFAULT_WORKERS_AI_TTS_MODEL: &str = "@cf/myshell-ai/melotts";

/// Default MeloTTS language
pub const DEFAULT_WORKERS_AI_TTS_LANGUAGE: &str = "en";

#[derive(Debug, Deserialize)]
struct MeloResult {
    audio: String,
}

/// Workers AI MeloTTS client
pub struct WorkersAiTTS {
    http_client: Client,
    url: String,
    api_token: String,
    language: String,
}

impl WorkersAiTTS {
    pub fn new(config: TTSConfig) -> TTSResult<Self> {
        let account_id = config
            .account_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                TTSError::InvalidConfiguration("Workers AI account id is required".to_string())
            })?;
        if config.api_key.is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "Workers AI API token is required".to_string(),
            ));
        }

        let model = if config.model.is_empty() {
            DEFAULT_WORKERS_AI_TTS_MODEL
        } else {
            config.model.as_str()
        };

        let http_client = Client::builder()
            .pool_max_idle_per_host(8)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                TTSError::InvalidConfiguration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            http_client,
            url: cloudflare::run_url(config.base_url.as_deref(), account_id, model),
            api_token: config.api_key,
            language: config
                .language
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| DEFAULT_WORKERS_AI_TTS_LANGUAGE.to_string()),
        })
    }
}

#[async_trait]
impl BaseTTS for WorkersAiTTS {
    async fn synthesize(&self, text: &str) -> TTSResult<Bytes> {
        debug!(chars = text.len(), "Requesting Workers AI MeloTTS synthesis");

        let response = self
            .http_client
            .post(&self.url)
            .bearer_auth(&self.api_token)
            .json(&json!({ "prompt": text, "lang": self.language }))
            .send()
            .await
            .map_err(|e| TTSError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TTSError::NetworkError(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = cloudflare::describe_failure(status, &body);
            return Err(if status.as_u16() == 401 || status.as_u16() == 403 {
                TTSError::AuthenticationFailed(message)
            } else {
                TTSError::ProviderError(message)
            });
        }

        let envelope: Envelope<MeloResult> = serde_json::from_str(&body)
            .map_err(|e| TTSError::ProviderError(format!("Malformed synthesis response: {e}")))?;
        let result = envelope.into_result().map_err(TTSError::ProviderError)?;

        let audio = BASE64
            .decode(result.audio.trim())
            .map_err(|e| TTSError::AudioDecodingError(format!("Invalid base64 audio: {e}")))?;
        Ok(Bytes::from(audio))
    }

    fn provider_name(&self) -> &'static str {
        "workers-ai"
    }
}
