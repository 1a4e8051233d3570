//! OpenAI speech synthesis over `POST {base}/audio/speech`.
//!
//! The endpoint returns the encoded clip directly as the response body.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::config::OpenAITTSConfig;
use crate::core::tts::base::{BaseTTS, TTSConfig, TTSError, TTSResult};

/// OpenAI TTS provider
pub struct OpenAITTS {
    config: OpenAITTSConfig,
    http_client: Client,
}

impl OpenAITTS {
    pub fn new(config: TTSConfig) -> TTSResult<Self> {
        if config.api_key.is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "OpenAI API key is required".to_string(),
            ));
        }

        let http_client = Client::builder()
            .pool_max_idle_per_host(8)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                TTSError::InvalidConfiguration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config: OpenAITTSConfig::from_base(&config),
            http_client,
        })
    }
}

#[async_trait]
impl BaseTTS for OpenAITTS {
    async fn synthesize(&self, text: &str) -> TTSResult<Bytes> {
        debug!(
            chars = text.len(),
            voice = self.config.voice.as_str(),
            "Requesting OpenAI speech synthesis"
        );

        let response = self
            .http_client
            .post(self.config.speech_url())
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "model": self.config.model.as_str(),
                "input": text,
                "voice": self.config.voice.as_str(),
                "response_format": self.config.response_format.as_str(),
            }))
            .send()
            .await
            .map_err(|e| TTSError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("OpenAI speech request failed ({status}): {body}");
            return Err(if status.as_u16() == 401 {
                TTSError::AuthenticationFailed(message)
            } else {
                TTSError::ProviderError(message)
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| TTSError::NetworkError(format!("Failed to read audio body: {e}")))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
