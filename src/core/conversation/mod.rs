//! Voice conversation core.
//!
//! - [`chunker`]: splits streamed reply text into sentence fragments
//! - [`dispatcher`]: synthesizes fragments concurrently, releases them in order
//! - [`history`]: per-session history and turn status
//! - [`coordinator`]: the per-connection state machine driving each turn

pub mod chunker;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod frames;
pub mod history;
mod turn;

use std::sync::Arc;
use std::time::Duration;

use crate::core::llm::BaseLLM;
use crate::core::stt::BaseSTT;
use crate::core::tts::BaseTTS;

pub use chunker::{DEFAULT_MAX_FRAGMENT_CHARS, Fragment, SentenceChunker};
pub use coordinator::SessionCoordinator;
pub use dispatcher::{DrainReport, ReorderBuffer, SynthesisDispatcher};
pub use error::ConversationError;
pub use frames::{ClientCommand, InboundFrame, OutboundFrame, SynthesizedAudio};
pub use history::{ChatMessage, ConversationState, Role, TurnStatus};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant in a voice conversation with the user";
pub const DEFAULT_MAX_TOKENS: u32 = 160;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_SYNTHESIS_CONCURRENCY: usize = 1;

/// The three external engines a session talks to. Shared by all sessions.
#[derive(Clone)]
pub struct Collaborators {
    pub stt: Arc<dyn BaseSTT>,
    pub llm: Arc<dyn BaseLLM>,
    pub tts: Arc<dyn BaseTTS>,
}

/// Tuning applied to every turn of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_fragment_chars: usize,
    pub synthesis_concurrency: usize,
    pub transcription_timeout: Duration,
    /// Applies to opening the stream and to each wait for the next delta.
    pub generation_timeout: Duration,
    pub synthesis_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            max_fragment_chars: DEFAULT_MAX_FRAGMENT_CHARS,
            synthesis_concurrency: DEFAULT_SYNTHESIS_CONCURRENCY,
            transcription_timeout: Duration::from_secs(30),
            generation_timeout: Duration::from_secs(30),
            synthesis_timeout: Duration::from_secs(30),
        }
    }
}
