pub mod cloudflare;
pub mod conversation;
pub mod llm;
pub mod stt;
pub mod tts;

// Re-export commonly used types for convenience
pub use conversation::{
    ChatMessage, Collaborators, ConversationError, ConversationState, InboundFrame, OutboundFrame,
    SessionCoordinator, SessionSettings, TurnStatus,
};
pub use llm::{BaseLLM, DeltaStream, GenerationRequest, LLMConfig, LLMError, create_llm_provider};
pub use stt::{BaseSTT, STTConfig, STTError, create_stt_provider};
pub use tts::{BaseTTS, TTSConfig, TTSError, create_tts_provider};
