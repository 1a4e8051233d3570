//! Configuration module for the voxchat gateway
//!
//! Server configuration comes from `.env` files, environment variables and an
//! optional YAML file. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use voxchat_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config = ServerConfig::from_file(&PathBuf::from("config.yaml"))?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

mod env;
mod merge;
mod validation;
mod yaml;

use crate::core::conversation::{
    DEFAULT_MAX_FRAGMENT_CHARS, DEFAULT_MAX_TOKENS, DEFAULT_SYNTHESIS_CONCURRENCY,
    DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE, SessionSettings,
};
use crate::core::llm::{LLMConfig, LLMProvider};
use crate::core::stt::{STTConfig, STTProvider};
use crate::core::tts::{TTSConfig, TTSProvider};

pub use yaml::YamlConfig;

/// Configuration loading and validation failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },
    #[error("Missing credential: {0} is required by the selected providers")]
    MissingCredential(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Per-turn tuning, as configured.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationConfig {
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Unterminated reply text longer than this is synthesized anyway
    pub max_fragment_chars: usize,
    /// Parallel synthesis calls per turn (1 = strictly sequential)
    pub synthesis_concurrency: usize,
    pub transcription_timeout_secs: u64,
    pub generation_timeout_secs: u64,
    pub synthesis_timeout_secs: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            max_fragment_chars: DEFAULT_MAX_FRAGMENT_CHARS,
            synthesis_concurrency: DEFAULT_SYNTHESIS_CONCURRENCY,
            transcription_timeout_secs: 30,
            generation_timeout_secs: 30,
            synthesis_timeout_secs: 30,
        }
    }
}

impl ConversationConfig {
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            system_prompt: self.system_prompt.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            max_fragment_chars: self.max_fragment_chars,
            synthesis_concurrency: self.synthesis_concurrency,
            transcription_timeout: Duration::from_secs(self.transcription_timeout_secs),
            generation_timeout: Duration::from_secs(self.generation_timeout_secs),
            synthesis_timeout: Duration::from_secs(self.synthesis_timeout_secs),
        }
    }
}

/// Credentials resolved for one provider.
#[derive(Debug, Clone, Default)]
struct ProviderCredentials {
    api_key: String,
    account_id: Option<String>,
    base_url: Option<String>,
}

/// Server configuration
///
/// Contains everything needed to run the gateway:
/// - Server settings (host, port, TLS)
/// - Provider selection and credentials (Cloudflare Workers AI, OpenAI)
/// - Model, voice and conversation tuning
/// - Security settings (CORS, rate limiting, connection limits)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Provider selection
    pub stt_provider: String,
    pub llm_provider: String,
    pub tts_provider: String,

    // Provider credentials
    pub cloudflare_account_id: Option<String>,
    pub cloudflare_api_token: Option<String>,
    /// Override for the Workers AI REST base (tests, gateways)
    pub cloudflare_api_base_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,

    // Models and voice; `None` picks the provider default
    pub stt_model: Option<String>,
    pub llm_model: Option<String>,
    pub tts_model: Option<String>,
    pub tts_voice: Option<String>,
    pub tts_language: String,

    pub conversation: ConversationConfig,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,
    /// Maximum concurrent WebSocket connections
    /// Default: None (unlimited)
    pub max_websocket_connections: Option<usize>,
    /// Maximum connections per IP address
    /// Default: 100
    pub max_connections_per_ip: u32,
}

/// Clear secrets from memory when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut token) = self.cloudflare_api_token {
            token.zeroize();
        }
        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (after `.env` has been
    /// loaded by the binary) and validate it.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file on top of the environment.
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_config = YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    pub fn session_settings(&self) -> SessionSettings {
        self.conversation.session_settings()
    }

    pub fn stt_config(&self) -> STTConfig {
        let workers_ai = matches!(self.stt_provider.parse::<STTProvider>(), Ok(STTProvider::WorkersAi));
        let credentials = self.credentials(workers_ai);
        STTConfig {
            provider: self.stt_provider.clone(),
            api_key: credentials.api_key,
            account_id: credentials.account_id,
            base_url: credentials.base_url,
            model: self.stt_model.clone().unwrap_or_default(),
            language: self.tts_language.clone(),
        }
    }

    pub fn llm_config(&self) -> LLMConfig {
        let workers_ai = matches!(self.llm_provider.parse::<LLMProvider>(), Ok(LLMProvider::WorkersAi));
        let credentials = self.credentials(workers_ai);
        LLMConfig {
            provider: self.llm_provider.clone(),
            api_key: credentials.api_key,
            account_id: credentials.account_id,
            base_url: credentials.base_url,
            model: self.llm_model.clone().unwrap_or_default(),
        }
    }

    pub fn tts_config(&self) -> TTSConfig {
        let workers_ai = matches!(self.tts_provider.parse::<TTSProvider>(), Ok(TTSProvider::WorkersAi));
        let credentials = self.credentials(workers_ai);
        TTSConfig {
            provider: self.tts_provider.clone(),
            api_key: credentials.api_key,
            account_id: credentials.account_id,
            base_url: credentials.base_url,
            model: self.tts_model.clone().unwrap_or_default(),
            voice_id: self.tts_voice.clone(),
            language: Some(self.tts_language.clone()),
            audio_format: None,
        }
    }

    fn credentials(&self, workers_ai: bool) -> ProviderCredentials {
        if workers_ai {
            ProviderCredentials {
                api_key: self.cloudflare_api_token.clone().unwrap_or_default(),
                account_id: self.cloudflare_account_id.clone(),
                base_url: self.cloudflare_api_base_url.clone(),
            }
        } else {
            ProviderCredentials {
                api_key: self.openai_api_key.clone().unwrap_or_default(),
                account_id: None,
                base_url: self.openai_base_url.clone(),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    /// A valid configuration using Workers AI for every stage
    pub(crate) fn test_config() -> ServerConfig {
        ServerConfig {
            host: "localhost".to_string(),
            port: 8787,
            tls: None,
            stt_provider: "workers-ai".to_string(),
            llm_provider: "workers-ai".to_string(),
            tts_provider: "workers-ai".to_string(),
            cloudflare_account_id: Some("acct".to_string()),
            cloudflare_api_token: Some("cf-token".to_string()),
            cloudflare_api_base_url: None,
            openai_api_key: None,
            openai_base_url: None,
            stt_model: None,
            llm_model: None,
            tts_model: None,
            tts_voice: None,
            tts_language: "en".to_string(),
            conversation: ConversationConfig::default(),
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
            max_websocket_connections: None,
            max_connections_per_ip: 100,
        }
    }

    const ENV_VARS: &[&str] = &[
        "HOST",
        "PORT",
        "TLS_CERT_PATH",
        "TLS_KEY_PATH",
        "STT_PROVIDER",
        "LLM_PROVIDER",
        "TTS_PROVIDER",
        "CLOUDFLARE_ACCOUNT_ID",
        "CLOUDFLARE_API_TOKEN",
        "CLOUDFLARE_API_BASE_URL",
        "OPENAI_API_KEY",
        "OPENAI_BASE_URL",
        "STT_MODEL",
        "LLM_MODEL",
        "TTS_MODEL",
        "TTS_VOICE",
        "TTS_LANGUAGE",
        "SYSTEM_PROMPT",
        "MAX_OUTPUT_TOKENS",
        "TEMPERATURE",
        "MAX_FRAGMENT_CHARS",
        "SYNTHESIS_CONCURRENCY",
        "TRANSCRIPTION_TIMEOUT_SECS",
        "GENERATION_TIMEOUT_SECS",
        "SYNTHESIS_TIMEOUT_SECS",
        "CORS_ALLOWED_ORIGINS",
        "RATE_LIMIT_REQUESTS_PER_SECOND",
        "RATE_LIMIT_BURST_SIZE",
        "MAX_WEBSOCKET_CONNECTIONS",
        "MAX_CONNECTIONS_PER_IP",
    ];

    // Helper to clean up environment variables
    fn cleanup_env_vars() {
        for name in ENV_VARS {
            unsafe {
                env::remove_var(name);
            }
        }
    }

    fn set_cloudflare_env() {
        unsafe {
            env::set_var("CLOUDFLARE_ACCOUNT_ID", "env-acct");
            env::set_var("CLOUDFLARE_API_TOKEN", "env-token");
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        cleanup_env_vars();
        set_cloudflare_env();

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.address(), "0.0.0.0:8787");
        assert!(!config.is_tls_enabled());
        assert_eq!(config.stt_provider, "workers-ai");
        assert_eq!(config.conversation, ConversationConfig::default());
        assert_eq!(config.conversation.max_tokens, 160);
        assert_eq!(config.conversation.temperature, 0.7);
        assert_eq!(config.conversation.synthesis_concurrency, 1);
        assert_eq!(config.max_connections_per_ip, 100);
        assert!(config.max_websocket_connections.is_none());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        cleanup_env_vars();
        set_cloudflare_env();
        unsafe {
            env::set_var("PORT", "9000");
            env::set_var("TEMPERATURE", "0.2");
            env::set_var("SYNTHESIS_CONCURRENCY", "3");
            env::set_var("SYSTEM_PROMPT", "Answer in one sentence");
            env::set_var("MAX_WEBSOCKET_CONNECTIONS", "50");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.conversation.temperature, 0.2);
        assert_eq!(config.conversation.synthesis_concurrency, 3);
        assert_eq!(config.conversation.system_prompt, "Answer in one sentence");
        assert_eq!(config.max_websocket_connections, Some(50));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_missing_credentials() {
        cleanup_env_vars();
        let result = ServerConfig::from_env();
        assert!(matches!(result, Err(ConfigError::MissingCredential(_))));
        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_half_tls_rejected() {
        cleanup_env_vars();
        set_cloudflare_env();
        unsafe {
            env::set_var("TLS_CERT_PATH", "/tmp/cert.pem");
        }
        assert!(matches!(
            ServerConfig::from_env(),
            Err(ConfigError::Invalid(msg)) if msg.contains("TLS")
        ));
        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();
        set_cloudflare_env();
        unsafe {
            env::set_var("HOST", "0.0.0.0");
            env::set_var("MAX_OUTPUT_TOKENS", "64");
        }

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 8080

providers:
  tts: "openai"

openai:
  api_key: "sk-yaml"

models:
  tts_voice: "nova"

conversation:
  max_tokens: 200
"#;
        fs::write(&config_path, yaml_content).unwrap();

        let config = ServerConfig::from_file(&config_path).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.conversation.max_tokens, 200);
        assert_eq!(config.cloudflare_account_id.as_deref(), Some("env-acct"));

        let tts = config.tts_config();
        assert_eq!(tts.api_key, "sk-yaml");
        assert_eq!(tts.voice_id.as_deref(), Some("nova"));
        assert!(tts.account_id.is_none());

        let stt = config.stt_config();
        assert_eq!(stt.api_key, "env-token");
        assert_eq!(stt.account_id.as_deref(), Some("env-acct"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();
        let result = ServerConfig::from_file(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_session_settings_conversion() {
        let mut config = test_config();
        config.conversation.generation_timeout_secs = 5;
        let settings = config.session_settings();
        assert_eq!(settings.generation_timeout, Duration::from_secs(5));
        assert_eq!(settings.max_fragment_chars, 120);
        assert_eq!(settings.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_llm_config_uses_workers_ai_credentials() {
        let mut config = test_config();
        config.cloudflare_api_base_url = Some("http://127.0.0.1:9999".to_string());
        config.llm_model = Some("@cf/meta/llama-3.2-3b-instruct".to_string());
        let llm = config.llm_config();
        assert_eq!(llm.api_key, "cf-token");
        assert_eq!(llm.base_url.as_deref(), Some("http://127.0.0.1:9999"));
        assert_eq!(llm.model, "@cf/meta/llama-3.2-3b-instruct");
    }
}
