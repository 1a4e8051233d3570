mod base;
pub mod openai;
pub mod sse;
pub mod workers_ai;

pub use base::{BaseLLM, BoxedLLM, DeltaStream, GenerationRequest, LLMConfig, LLMError, LLMResult};
pub use openai::{DEFAULT_OPENAI_LLM_MODEL, OpenAILLM};
pub use workers_ai::{DEFAULT_WORKERS_AI_LLM_MODEL, WorkersAiLLM};

/// Supported text generation providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LLMProvider {
    /// Cloudflare Workers AI text generation
    WorkersAi,
    /// OpenAI chat completions
    OpenAI,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::WorkersAi => write!(f, "workers-ai"),
            LLMProvider::OpenAI => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "workers-ai" | "workers_ai" | "cloudflare" | "cf" => Ok(LLMProvider::WorkersAi),
            "openai" => Ok(LLMProvider::OpenAI),
            _ => Err(LLMError::InvalidConfiguration(format!(
                "Unsupported LLM provider: {s}. Supported providers: workers-ai, openai"
            ))),
        }
    }
}

/// Factory function to create a generation provider by name
pub fn create_llm_provider(provider: &str, config: LLMConfig) -> LLMResult<BoxedLLM> {
    match provider.parse::<LLMProvider>()? {
        LLMProvider::WorkersAi => Ok(Box::new(WorkersAiLLM::new(config)?)),
        LLMProvider::OpenAI => Ok(Box::new(OpenAILLM::new(config)?)),
    }
}

pub fn get_supported_llm_providers() -> Vec<&'static str> {
    vec!["workers-ai", "openai"]
}
