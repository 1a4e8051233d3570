use crate::core::llm::LLMError;
use crate::core::stt::STTError;
use crate::core::tts::TTSError;

/// Everything that can go wrong inside a session.
///
/// None of these are fatal to the process. `Synthesis` only affects its own
/// fragment; `Transcription` and `Generation` abort the turn;
/// `ProtocolViolation` is reported and the offending frame ignored;
/// `TransportClosed` ends the session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversationError {
    #[error("transcription failed: {0}")]
    Transcription(#[from] STTError),

    #[error("generation failed: {0}")]
    Generation(#[from] LLMError),

    #[error("synthesis failed for fragment {sequence}: {source}")]
    Synthesis { sequence: u64, source: TTSError },

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("transport closed")]
    TransportClosed,
}

impl ConversationError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolViolation(message.into())
    }
}
