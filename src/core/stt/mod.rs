mod base;
pub mod openai;
pub mod workers_ai;

// Re-export public types and traits
pub use base::{BaseSTT, STTConfig, STTError};

// Re-export OpenAI implementation
pub use openai::{OpenAISTT, OpenAISTTConfig, OpenAISTTModel};

// Re-export Workers AI implementation
pub use workers_ai::{DEFAULT_WORKERS_AI_STT_MODEL, WorkersAiSTT};

/// Supported STT providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum STTProvider {
    /// Cloudflare Workers AI Whisper REST API
    WorkersAi,
    /// OpenAI Whisper STT REST API
    OpenAI,
}

impl std::fmt::Display for STTProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            STTProvider::WorkersAi => write!(f, "workers-ai"),
            STTProvider::OpenAI => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for STTProvider {
    type Err = STTError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "workers-ai" | "workers_ai" | "cloudflare" | "cf" => Ok(STTProvider::WorkersAi),
            "openai" => Ok(STTProvider::OpenAI),
            _ => Err(STTError::ConfigurationError(format!(
                "Unsupported STT provider: {s}. Supported providers: workers-ai, openai"
            ))),
        }
    }
}

/// Factory function to create STT providers by name
///
/// # Examples
/// ```rust,no_run
/// use voxchat_gateway::core::stt::{create_stt_provider, STTConfig};
///
/// let stt = create_stt_provider("workers-ai", STTConfig {
///     api_key: "cf-token".to_string(),
///     account_id: Some("account".to_string()),
///     ..Default::default()
/// }).unwrap();
/// assert_eq!(stt.provider_name(), "workers-ai");
/// ```
pub fn create_stt_provider(
    provider: &str,
    config: STTConfig,
) -> Result<Box<dyn BaseSTT>, STTError> {
    create_stt_provider_from_enum(provider.parse()?, config)
}

/// Factory function to create STT providers using the enum directly
pub fn create_stt_provider_from_enum(
    provider: STTProvider,
    config: STTConfig,
) -> Result<Box<dyn BaseSTT>, STTError> {
    match provider {
        STTProvider::WorkersAi => Ok(Box::new(WorkersAiSTT::new(config)?)),
        STTProvider::OpenAI => Ok(Box::new(OpenAISTT::new(config)?)),
    }
}

/// Names accepted by [`create_stt_provider`]
pub fn get_supported_stt_providers() -> Vec<&'static str> {
    vec!["workers-ai", "openai"]
}
