//! OpenAI text-to-speech.
//!
//! - Endpoint: `POST https://api.openai.com/v1/audio/speech`
//! - Models: tts-1, tts-1-hd, gpt-4o-mini-tts
//! - Output: mp3 by default

mod config;
mod provider;

pub use config::{
    AudioOutputFormat, OPENAI_API_BASE_URL, OpenAITTSConfig, OpenAITTSModel, OpenAIVoice,
};
pub use provider::OpenAITTS;
