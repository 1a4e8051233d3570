mod base;
pub mod openai;
pub mod workers_ai;

pub use base::{BaseTTS, BoxedTTS, TTSConfig, TTSError, TTSResult};
pub use openai::{AudioOutputFormat, OpenAITTS, OpenAITTSModel, OpenAIVoice};
pub use workers_ai::{DEFAULT_WORKERS_AI_TTS_MODEL, WorkersAiTTS};

/// Supported TTS providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TTSProvider {
    /// Cloudflare Workers AI MeloTTS
    WorkersAi,
    /// OpenAI audio speech API
    OpenAI,
}

impl std::fmt::Display for TTSProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TTSProvider::WorkersAi => write!(f, "workers-ai"),
            TTSProvider::OpenAI => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for TTSProvider {
    type Err = TTSError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "workers-ai" | "workers_ai" | "cloudflare" | "cf" => Ok(TTSProvider::WorkersAi),
            "openai" => Ok(TTSProvider::OpenAI),
            _ => Err(TTSError::InvalidConfiguration(format!(
                "Unsupported TTS provider: {s}. Supported providers: workers-ai, openai"
            ))),
        }
    }
}

/// Factory function to create a TTS provider by name
pub fn create_tts_provider(provider_type: &str, config: TTSConfig) -> TTSResult<BoxedTTS> {
    match provider_type.parse::<TTSProvider>()? {
        TTSProvider::WorkersAi => Ok(Box::new(WorkersAiTTS::new(config)?)),
        TTSProvider::OpenAI => Ok(Box::new(OpenAITTS::new(config)?)),
    }
}

pub fn get_supported_tts_providers() -> Vec<&'static str> {
    vec!["workers-ai", "openai"]
}
