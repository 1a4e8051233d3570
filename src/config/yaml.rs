use serde::Deserialize;
use std::path::Path;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// Every field is optional; values present here override the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8787
///   tls:
///     cert_path: "/etc/voxchat/cert.pem"
///     key_path: "/etc/voxchat/key.pem"
///
/// providers:
///   stt: "workers-ai"
///   llm: "workers-ai"
///   tts: "openai"
///
/// cloudflare:
///   account_id: "0123456789abcdef"
///   api_token: "cf-token"
///
/// openai:
///   api_key: "sk-..."
///
/// models:
///   llm: "@cf/meta/llama-3.1-8b-instruct"
///   tts_voice: "nova"
///
/// conversation:
///   system_prompt: "You are a friendly tutor"
///   max_tokens: 200
///   temperature: 0.5
///   synthesis_concurrency: 2
///
/// security:
///   cors_allowed_origins: "*"
///   max_connections_per_ip: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub providers: Option<ProvidersYaml>,
    pub cloudflare: Option<CloudflareYaml>,
    pub openai: Option<OpenAIYaml>,
    pub models: Option<ModelsYaml>,
    pub conversation: Option<ConversationYaml>,
    pub security: Option<SecurityYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Provider selection per stage
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub stt: Option<String>,
    pub llm: Option<String>,
    pub tts: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CloudflareYaml {
    pub account_id: Option<String>,
    pub api_token: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OpenAIYaml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ModelsYaml {
    pub stt: Option<String>,
    pub llm: Option<String>,
    pub tts: Option<String>,
    pub tts_voice: Option<String>,
    pub tts_language: Option<String>,
}

/// Per-turn tuning
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConversationYaml {
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub max_fragment_chars: Option<usize>,
    pub synthesis_concurrency: Option<usize>,
    pub transcription_timeout_secs: Option<u64>,
    pub generation_timeout_secs: Option<u64>,
    pub synthesis_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
    pub max_websocket_connections: Option<usize>,
    pub max_connections_per_ip: Option<u32>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&contents)?)
    }
}
