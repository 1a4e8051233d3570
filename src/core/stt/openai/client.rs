//! OpenAI STT (Whisper) client implementation.
//!
//! Whisper is a batch REST API: each audio chunk is uploaded as a multipart
//! file and the transcript comes back in one response. The HTTP client is
//! reused across calls for connection pooling.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, info};

use super::super::base::{BaseSTT, STTConfig, STTError};
use super::config::{AudioInputFormat, OpenAISTTConfig};
use super::messages::{OpenAIErrorResponse, TranscriptionResponse};

/// OpenAI STT (Whisper) client implementing the `BaseSTT` trait.
///
/// # Example
///
/// ```rust,no_run
/// use voxchat_gateway::core::stt::{BaseSTT, STTConfig, OpenAISTT};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let stt = OpenAISTT::new(STTConfig {
///         api_key: "sk-...".to_string(),
///         model: "whisper-1".to_string(),
///         language: "en".to_string(),
///         ..Default::default()
///     })?;
///
///     let audio = std::fs::read("question.webm")?;
///     println!("{}", stt.transcribe(audio.into()).await?);
///     Ok(())
/// }
/// ```
pub struct OpenAISTT {
    config: OpenAISTTConfig,
    http_client: Client,
}

impl OpenAISTT {
    /// Create a new OpenAI STT client from the shared configuration.
    pub fn new(config: STTConfig) -> Result<Self, STTError> {
        Self::with_config(OpenAISTTConfig::from_base(config))
    }

    /// Create a new OpenAI STT client with provider-specific configuration.
    pub fn with_config(config: OpenAISTTConfig) -> Result<Self, STTError> {
        config.validate().map_err(STTError::ConfigurationError)?;

        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| {
                STTError::ConfigurationError(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }
}

#[async_trait]
impl BaseSTT for OpenAISTT {
    async fn transcribe(&self, audio: Bytes) -> Result<String, STTError> {
        if audio.is_empty() {
            return Err(STTError::AudioProcessingError(
                "Audio chunk is empty".to_string(),
            ));
        }
        if audio.len() > self.config.max_file_size_bytes {
            return Err(STTError::AudioProcessingError(format!(
                "Audio chunk ({} bytes) exceeds maximum file size ({} bytes)",
                audio.len(),
                self.config.max_file_size_bytes
            )));
        }

        let format = AudioInputFormat::sniff(&audio);
        debug!(
            bytes = audio.len(),
            format = format.extension(),
            "Sending audio to OpenAI Whisper API"
        );

        let file_part = Part::bytes(audio.to_vec())
            .file_name(format!("audio.{}", format.extension()))
            .mime_str(format.mime_type())
            .map_err(|e| STTError::ConfigurationError(format!("Invalid MIME type: {e}")))?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.config.model.as_str().to_string())
            .text("response_format", "json".to_string());

        if !self.config.base.language.is_empty() {
            form = form.text("language", self.config.base.language.clone());
        }

        let response = self
            .http_client
            .post(self.config.api_url())
            .bearer_auth(&self.config.base.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| STTError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| STTError::NetworkError(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let error_msg = OpenAIErrorResponse::describe(status, &response_text);
            return Err(if status.as_u16() == 401 {
                STTError::AuthenticationFailed(error_msg)
            } else {
                STTError::ProviderError(error_msg)
            });
        }

        let parsed: TranscriptionResponse = serde_json::from_str(&response_text).map_err(|e| {
            STTError::ProviderError(format!("Malformed transcription response: {e}"))
        })?;

        let text = parsed.text.trim().to_string();
        info!(chars = text.len(), "OpenAI transcription complete");
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
