use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;

use crate::core::conversation::ChatMessage;

/// Errors produced by text generation providers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LLMError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Malformed stream event: {0}")]
    StreamError(String),
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),
}

pub type LLMResult<T> = Result<T, LLMError>;

/// Lazily produced reply text, one delta per item.
pub type DeltaStream = Pin<Box<dyn Stream<Item = LLMResult<String>> + Send>>;

/// Provider-independent LLM configuration.
#[derive(Debug, Clone, Default)]
pub struct LLMConfig {
    pub provider: String,
    pub api_key: String,
    pub account_id: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
}

/// One generation call: a system instruction plus the conversation so far.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait BaseLLM: Send + Sync {
    /// Open a streamed completion. Dropping the returned stream aborts the
    /// underlying request.
    async fn generate_stream(&self, request: GenerationRequest) -> LLMResult<DeltaStream>;

    fn provider_name(&self) -> &'static str;
}

pub type BoxedLLM = Box<dyn BaseLLM>;
