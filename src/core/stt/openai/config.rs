//! Configuration types for OpenAI STT (Whisper) API.
//!
//! - Model selection (whisper-1, gpt-4o-transcribe, gpt-4o-mini-transcribe)
//! - Audio container detection for the multipart upload

use serde::{Deserialize, Serialize};

use super::super::base::STTConfig;

/// Default OpenAI REST base URL
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";

// =============================================================================
// OpenAI STT Models
// =============================================================================

/// Supported OpenAI STT models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpenAISTTModel {
    /// Original Whisper model - good balance of speed and accuracy
    #[default]
    #[serde(rename = "whisper-1")]
    Whisper1,
    /// GPT-4o enhanced transcription - best accuracy
    #[serde(rename = "gpt-4o-transcribe")]
    Gpt4oTranscribe,
    /// GPT-4o mini transcription - faster, cost-effective
    #[serde(rename = "gpt-4o-mini-transcribe")]
    Gpt4oMiniTranscribe,
}

impl OpenAISTTModel {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whisper1 => "whisper-1",
            Self::Gpt4oTranscribe => "gpt-4o-transcribe",
            Self::Gpt4oMiniTranscribe => "gpt-4o-mini-transcribe",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "whisper-1" | "whisper1" | "whisper" => Self::Whisper1,
            "gpt-4o-transcribe" | "gpt4o-transcribe" => Self::Gpt4oTranscribe,
            "gpt-4o-mini-transcribe" | "gpt4o-mini-transcribe" => Self::Gpt4oMiniTranscribe,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for OpenAISTTModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Audio Input Format
// =============================================================================

/// Audio container of an uploaded chunk.
///
/// Browsers usually record WebM/Opus; the format is detected from the
/// payload's magic bytes so the upload carries a matching file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioInputFormat {
    #[default]
    Webm,
    Wav,
    Mp3,
    Ogg,
    Mp4,
}

impl AudioInputFormat {
    /// Get the MIME type for this format.
    #[inline]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Webm => "audio/webm",
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Ogg => "audio/ogg",
            Self::Mp4 => "audio/mp4",
        }
    }

    /// Get the file extension for this format.
    #[inline]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Webm => "webm",
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Mp4 => "mp4",
        }
    }

    /// Detect the container from leading magic bytes, defaulting to WebM.
    pub fn sniff(data: &[u8]) -> Self {
        match data {
            [b'R', b'I', b'F', b'F', ..] => Self::Wav,
            [0x1A, 0x45, 0xDF, 0xA3, ..] => Self::Webm,
            [b'O', b'g', b'g', b'S', ..] => Self::Ogg,
            [b'I', b'D', b'3', ..] | [0xFF, 0xFB, ..] | [0xFF, 0xF3, ..] => Self::Mp3,
            [_, _, _, _, b'f', b't', b'y', b'p', ..] => Self::Mp4,
            _ => Self::default(),
        }
    }
}

// =============================================================================
// Provider Configuration
// =============================================================================

/// OpenAI-specific STT configuration.
#[derive(Debug, Clone)]
pub struct OpenAISTTConfig {
    /// Base STT configuration (shared across all providers).
    pub base: STTConfig,
    /// OpenAI STT model to use.
    pub model: OpenAISTTModel,
    /// Maximum upload size in bytes (OpenAI limit is 25MB).
    pub max_file_size_bytes: usize,
}

impl OpenAISTTConfig {
    /// Build from the shared configuration.
    pub fn from_base(base: STTConfig) -> Self {
        let model = OpenAISTTModel::from_str_or_default(&base.model);
        Self {
            base,
            model,
            max_file_size_bytes: 25 * 1024 * 1024,
        }
    }

    /// Transcription endpoint, honouring a base URL override.
    pub fn api_url(&self) -> String {
        let base = self
            .base
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_API_BASE_URL)
            .trim_end_matches('/');
        format!("{base}/audio/transcriptions")
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base.api_key.is_empty() {
            return Err("API key is required".to_string());
        }
        Ok(())
    }
}
