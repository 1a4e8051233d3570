use std::env;
use std::str::FromStr;

use super::validation::tls_from_paths;
use super::{ConfigError, ConversationConfig, ServerConfig};

/// Read a variable, treating unset and empty the same.
pub(super) fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a variable, falling back to `default` when unset.
pub(super) fn parse_env<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env_var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                value,
            }),
        None => Ok(default),
    }
}

fn parse_env_opt<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    env_var(name)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                value,
            })
        })
        .transpose()
}

/// Build a configuration from environment variables and defaults.
pub(super) fn load_from_env() -> Result<ServerConfig, ConfigError> {
    let defaults = ConversationConfig::default();
    let conversation = ConversationConfig {
        system_prompt: env_var("SYSTEM_PROMPT").unwrap_or(defaults.system_prompt),
        max_tokens: parse_env("MAX_OUTPUT_TOKENS", defaults.max_tokens)?,
        temperature: parse_env("TEMPERATURE", defaults.temperature)?,
        max_fragment_chars: parse_env("MAX_FRAGMENT_CHARS", defaults.max_fragment_chars)?,
        synthesis_concurrency: parse_env("SYNTHESIS_CONCURRENCY", defaults.synthesis_concurrency)?,
        transcription_timeout_secs: parse_env(
            "TRANSCRIPTION_TIMEOUT_SECS",
            defaults.transcription_timeout_secs,
        )?,
        generation_timeout_secs: parse_env(
            "GENERATION_TIMEOUT_SECS",
            defaults.generation_timeout_secs,
        )?,
        synthesis_timeout_secs: parse_env(
            "SYNTHESIS_TIMEOUT_SECS",
            defaults.synthesis_timeout_secs,
        )?,
    };

    Ok(ServerConfig {
        host: env_var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
        port: parse_env("PORT", 8787)?,
        tls: tls_from_paths(env_var("TLS_CERT_PATH"), env_var("TLS_KEY_PATH"))?,

        stt_provider: env_var("STT_PROVIDER").unwrap_or_else(|| "workers-ai".to_string()),
        llm_provider: env_var("LLM_PROVIDER").unwrap_or_else(|| "workers-ai".to_string()),
        tts_provider: env_var("TTS_PROVIDER").unwrap_or_else(|| "workers-ai".to_string()),

        cloudflare_account_id: env_var("CLOUDFLARE_ACCOUNT_ID"),
        cloudflare_api_token: env_var("CLOUDFLARE_API_TOKEN"),
        cloudflare_api_base_url: env_var("CLOUDFLARE_API_BASE_URL"),
        openai_api_key: env_var("OPENAI_API_KEY"),
        openai_base_url: env_var("OPENAI_BASE_URL"),

        stt_model: env_var("STT_MODEL"),
        llm_model: env_var("LLM_MODEL"),
        tts_model: env_var("TTS_MODEL"),
        tts_voice: env_var("TTS_VOICE"),
        tts_language: env_var("TTS_LANGUAGE").unwrap_or_else(|| "en".to_string()),

        conversation,

        cors_allowed_origins: env_var("CORS_ALLOWED_ORIGINS"),
        rate_limit_requests_per_second: parse_env("RATE_LIMIT_REQUESTS_PER_SECOND", 60)?,
        rate_limit_burst_size: parse_env("RATE_LIMIT_BURST_SIZE", 10)?,
        max_websocket_connections: parse_env_opt("MAX_WEBSOCKET_CONNECTIONS")?,
        max_connections_per_ip: parse_env("MAX_CONNECTIONS_PER_IP", 100)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_parse_env_invalid_number() {
        unsafe {
            env::set_var("VOXCHAT_TEST_NUMBER", "twelve");
        }
        let result: Result<u32, _> = parse_env("VOXCHAT_TEST_NUMBER", 1);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref name, .. }) if name == "VOXCHAT_TEST_NUMBER"
        ));
        unsafe {
            env::remove_var("VOXCHAT_TEST_NUMBER");
        }
    }

    #[test]
    #[serial]
    fn test_empty_value_uses_default() {
        unsafe {
            env::set_var("VOXCHAT_TEST_EMPTY", "  ");
        }
        assert_eq!(parse_env("VOXCHAT_TEST_EMPTY", 7u16).unwrap(), 7);
        assert_eq!(env_var("VOXCHAT_TEST_EMPTY"), None);
        unsafe {
            env::remove_var("VOXCHAT_TEST_EMPTY");
        }
    }
}
