use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

/// Errors produced by text-to-speech providers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TTSError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Audio decoding error: {0}")]
    AudioDecodingError(String),
    #[error("Synthesis timed out after {0:?}")]
    Timeout(Duration),
}

pub type TTSResult<T> = Result<T, TTSError>;

/// Provider-independent TTS configuration.
#[derive(Debug, Clone, Default)]
pub struct TTSConfig {
    pub provider: String,
    pub api_key: String,
    pub account_id: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub voice_id: Option<String>,
    pub language: Option<String>,
    pub audio_format: Option<String>,
}

/// Text-to-speech collaborator: one sentence in, one encoded audio clip out.
#[async_trait]
pub trait BaseTTS: Send + Sync {
    async fn synthesize(&self, text: &str) -> TTSResult<Bytes>;

    fn provider_name(&self) -> &'static str;
}

pub type BoxedTTS = Box<dyn BaseTTS>;
