use super::env::load_from_env;
use super::validation::tls_from_paths;
use super::yaml::YamlConfig;
use super::{ConfigError, ServerConfig};

/// Environment first, then YAML values on top.
pub(super) fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, ConfigError> {
    let mut config = load_from_env()?;
    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(tls) = server.tls {
            config.tls = tls_from_paths(tls.cert_path, tls.key_path)?;
        }
    }

    if let Some(providers) = yaml.providers {
        override_with(&mut config.stt_provider, providers.stt);
        override_with(&mut config.llm_provider, providers.llm);
        override_with(&mut config.tts_provider, providers.tts);
    }

    if let Some(cloudflare) = yaml.cloudflare {
        override_opt(&mut config.cloudflare_account_id, cloudflare.account_id);
        override_opt(&mut config.cloudflare_api_token, cloudflare.api_token);
        override_opt(&mut config.cloudflare_api_base_url, cloudflare.base_url);
    }

    if let Some(openai) = yaml.openai {
        override_opt(&mut config.openai_api_key, openai.api_key);
        override_opt(&mut config.openai_base_url, openai.base_url);
    }

    if let Some(models) = yaml.models {
        override_opt(&mut config.stt_model, models.stt);
        override_opt(&mut config.llm_model, models.llm);
        override_opt(&mut config.tts_model, models.tts);
        override_opt(&mut config.tts_voice, models.tts_voice);
        override_with(&mut config.tts_language, models.tts_language);
    }

    if let Some(conversation) = yaml.conversation {
        let target = &mut config.conversation;
        override_with(&mut target.system_prompt, conversation.system_prompt);
        override_with(&mut target.max_tokens, conversation.max_tokens);
        override_with(&mut target.temperature, conversation.temperature);
        override_with(&mut target.max_fragment_chars, conversation.max_fragment_chars);
        override_with(
            &mut target.synthesis_concurrency,
            conversation.synthesis_concurrency,
        );
        override_with(
            &mut target.transcription_timeout_secs,
            conversation.transcription_timeout_secs,
        );
        override_with(
            &mut target.generation_timeout_secs,
            conversation.generation_timeout_secs,
        );
        override_with(
            &mut target.synthesis_timeout_secs,
            conversation.synthesis_timeout_secs,
        );
    }

    if let Some(security) = yaml.security {
        override_opt(&mut config.cors_allowed_origins, security.cors_allowed_origins);
        override_with(
            &mut config.rate_limit_requests_per_second,
            security.rate_limit_requests_per_second,
        );
        override_with(&mut config.rate_limit_burst_size, security.rate_limit_burst_size);
        override_opt(
            &mut config.max_websocket_connections,
            security.max_websocket_connections,
        );
        override_with(
            &mut config.max_connections_per_ip,
            security.max_connections_per_ip,
        );
    }

    Ok(config)
}

fn override_with<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn override_opt<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}
