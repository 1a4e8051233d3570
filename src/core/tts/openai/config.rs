//! Configuration types for the OpenAI speech endpoint.

use serde::{Deserialize, Serialize};

use super::super::base::TTSConfig;

/// Default OpenAI REST base URL
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Supported OpenAI TTS models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpenAITTSModel {
    /// Lowest latency
    #[default]
    #[serde(rename = "tts-1")]
    Tts1,
    #[serde(rename = "tts-1-hd")]
    Tts1Hd,
    #[serde(rename = "gpt-4o-mini-tts")]
    Gpt4oMiniTts,
}

impl OpenAITTSModel {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tts1 => "tts-1",
            Self::Tts1Hd => "tts-1-hd",
            Self::Gpt4oMiniTts => "gpt-4o-mini-tts",
        }
    }

    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "tts-1-hd" | "tts1-hd" => Self::Tts1Hd,
            "gpt-4o-mini-tts" | "gpt4o-mini-tts" => Self::Gpt4oMiniTts,
            _ => Self::Tts1,
        }
    }
}

/// Voices accepted by the speech endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenAIVoice {
    #[default]
    Alloy,
    Ash,
    Coral,
    Echo,
    Fable,
    Onyx,
    Nova,
    Sage,
    Shimmer,
}

impl OpenAIVoice {
    const ALL: [OpenAIVoice; 9] = [
        Self::Alloy,
        Self::Ash,
        Self::Coral,
        Self::Echo,
        Self::Fable,
        Self::Onyx,
        Self::Nova,
        Self::Sage,
        Self::Shimmer,
    ];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Fable => "fable",
            Self::Onyx => "onyx",
            Self::Nova => "nova",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
        }
    }

    /// Case-insensitive lookup; unknown names fall back to `alloy`.
    pub fn from_str_or_default(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|voice| voice.as_str().eq_ignore_ascii_case(s.trim()))
            .unwrap_or_default()
    }

    pub fn all() -> &'static [OpenAIVoice] {
        &Self::ALL
    }
}

/// Encoded container returned by the speech endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioOutputFormat {
    #[default]
    Mp3,
    Opus,
    Aac,
    Wav,
}

impl AudioOutputFormat {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Aac => "aac",
            Self::Wav => "wav",
        }
    }

    #[inline]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Opus => "audio/opus",
            Self::Aac => "audio/aac",
            Self::Wav => "audio/wav",
        }
    }

    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "opus" => Self::Opus,
            "aac" => Self::Aac,
            "wav" => Self::Wav,
            _ => Self::Mp3,
        }
    }
}

/// Resolved OpenAI TTS settings.
#[derive(Debug, Clone)]
pub struct OpenAITTSConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: OpenAITTSModel,
    pub voice: OpenAIVoice,
    pub response_format: AudioOutputFormat,
}

impl OpenAITTSConfig {
    pub fn from_base(base: &TTSConfig) -> Self {
        Self {
            api_key: base.api_key.clone(),
            base_url: base
                .base_url
                .as_deref()
                .unwrap_or(OPENAI_API_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: OpenAITTSModel::from_str_or_default(&base.model),
            voice: base
                .voice_id
                .as_deref()
                .map(OpenAIVoice::from_str_or_default)
                .unwrap_or_default(),
            response_format: base
                .audio_format
                .as_deref()
                .map(AudioOutputFormat::from_str_or_default)
                .unwrap_or_default(),
        }
    }

    pub fn speech_url(&self) -> String {
        format!("{}/audio/speech", self.base_url)
    }
}
