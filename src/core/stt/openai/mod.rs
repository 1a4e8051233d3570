//! OpenAI Speech-to-Text (Whisper) API integration.
//!
//! - [`config`]: Configuration types (`OpenAISTTConfig`, `OpenAISTTModel`, `AudioInputFormat`)
//! - [`messages`]: Response and error types for the transcription API
//! - [`client`]: The `OpenAISTT` client implementation
//!
//! # API Reference
//!
//! - API Endpoint: `POST https://api.openai.com/v1/audio/transcriptions`
//! - Max file size: 25MB
//! - Supported formats: mp3, mp4, mpeg, mpga, m4a, ogg, wav, webm

mod client;
mod config;
mod messages;

pub use client::OpenAISTT;
pub use config::{AudioInputFormat, OPENAI_API_BASE_URL, OpenAISTTConfig, OpenAISTTModel};
pub use messages::{OpenAIError, OpenAIErrorResponse, TranscriptionResponse};
