use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

/// Errors produced by speech-to-text providers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum STTError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Audio processing error: {0}")]
    AudioProcessingError(String),
    #[error("Transcription timed out after {0:?}")]
    Timeout(Duration),
}

/// Provider-independent STT configuration.
///
/// `account_id` is only consulted by providers that scope requests to an
/// account (Workers AI). `base_url` overrides the provider's public endpoint.
#[derive(Debug, Clone, Default)]
pub struct STTConfig {
    pub provider: String,
    pub api_key: String,
    pub account_id: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub language: String,
}

/// Speech-to-text collaborator.
///
/// One call transcribes one complete audio payload; there is no streaming
/// or connection state to manage.
#[async_trait]
pub trait BaseSTT: Send + Sync {
    /// Transcribe a complete audio chunk into text.
    async fn transcribe(&self, audio: Bytes) -> Result<String, STTError>;

    /// Provider name used in logs.
    fn provider_name(&self) -> &'static str;
}
