use std::path::PathBuf;

use super::{ConfigError, ServerConfig, TlsConfig};
use crate::core::llm::LLMProvider;
use crate::core::stt::STTProvider;
use crate::core::tts::TTSProvider;

/// Both TLS paths or neither.
pub(super) fn tls_from_paths(
    cert_path: Option<String>,
    key_path: Option<String>,
) -> Result<Option<TlsConfig>, ConfigError> {
    match (cert_path, key_path) {
        (Some(cert), Some(key)) => Ok(Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        })),
        (None, None) => Ok(None),
        _ => Err(ConfigError::Invalid(
            "TLS requires both TLS_CERT_PATH and TLS_KEY_PATH".to_string(),
        )),
    }
}

pub(super) fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    validate_conversation(config)?;
    validate_providers(config)?;
    Ok(())
}

fn validate_conversation(config: &ServerConfig) -> Result<(), ConfigError> {
    let conversation = &config.conversation;
    if !(0.0..=2.0).contains(&conversation.temperature) {
        return Err(ConfigError::Invalid(format!(
            "temperature must be between 0.0 and 2.0, got {}",
            conversation.temperature
        )));
    }
    if conversation.max_tokens == 0 {
        return Err(ConfigError::Invalid(
            "max_tokens must be greater than zero".to_string(),
        ));
    }
    if conversation.synthesis_concurrency == 0 {
        return Err(ConfigError::Invalid(
            "synthesis_concurrency must be at least 1".to_string(),
        ));
    }
    if conversation.max_fragment_chars == 0 {
        return Err(ConfigError::Invalid(
            "max_fragment_chars must be at least 1".to_string(),
        ));
    }
    let timeouts = [
        ("transcription", conversation.transcription_timeout_secs),
        ("generation", conversation.generation_timeout_secs),
        ("synthesis", conversation.synthesis_timeout_secs),
    ];
    if let Some((stage, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
        return Err(ConfigError::Invalid(format!(
            "{stage} timeout must be at least one second"
        )));
    }
    Ok(())
}

fn validate_providers(config: &ServerConfig) -> Result<(), ConfigError> {
    let stt: STTProvider = config
        .stt_provider
        .parse()
        .map_err(|e: crate::core::stt::STTError| ConfigError::Invalid(e.to_string()))?;
    let llm: LLMProvider = config
        .llm_provider
        .parse()
        .map_err(|e: crate::core::llm::LLMError| ConfigError::Invalid(e.to_string()))?;
    let tts: TTSProvider = config
        .tts_provider
        .parse()
        .map_err(|e: crate::core::tts::TTSError| ConfigError::Invalid(e.to_string()))?;

    let needs_workers_ai = stt == STTProvider::WorkersAi
        || llm == LLMProvider::WorkersAi
        || tts == TTSProvider::WorkersAi;
    let needs_openai =
        stt == STTProvider::OpenAI || llm == LLMProvider::OpenAI || tts == TTSProvider::OpenAI;

    if needs_workers_ai {
        if config.cloudflare_account_id.is_none() {
            return Err(ConfigError::MissingCredential("CLOUDFLARE_ACCOUNT_ID"));
        }
        if config.cloudflare_api_token.is_none() {
            return Err(ConfigError::MissingCredential("CLOUDFLARE_API_TOKEN"));
        }
    }
    if needs_openai && config.openai_api_key.is_none() {
        return Err(ConfigError::MissingCredential("OPENAI_API_KEY"));
    }
    Ok(())
}
