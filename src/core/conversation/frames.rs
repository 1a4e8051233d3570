//! Transport-neutral session frames.
//!
//! The WebSocket layer turns socket messages into [`InboundFrame`]s and
//! serializes [`OutboundFrame`]s; the coordinator never sees JSON.

use bytes::Bytes;
use serde::Deserialize;

use super::error::ConversationError;
use super::history::TurnStatus;

/// Raw frame received from the client.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Text frame, expected to carry a JSON command
    Text(String),
    /// One audio chunk
    Binary(Bytes),
}

/// Parsed text-frame command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// `{"type":"cmd","data":"clear"}`
    Clear,
    /// `{"type":"text","data":"..."}`, a typed user turn
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
enum WireCommand {
    Cmd(String),
    Text(String),
}

impl ClientCommand {
    pub fn parse(raw: &str) -> Result<Self, ConversationError> {
        let command: WireCommand = serde_json::from_str(raw)
            .map_err(|e| ConversationError::protocol(format!("invalid command frame: {e}")))?;
        match command {
            WireCommand::Cmd(name) if name == "clear" => Ok(Self::Clear),
            WireCommand::Cmd(name) => Err(ConversationError::protocol(format!(
                "unknown command: {name}"
            ))),
            WireCommand::Text(text) if text.trim().is_empty() => {
                Err(ConversationError::protocol("text input is empty"))
            }
            WireCommand::Text(text) => Ok(Self::Text(text.trim().to_string())),
        }
    }
}

/// Audio for one fragment, released in sequence order.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    pub sequence: u64,
    pub text: String,
    pub audio: Bytes,
}

/// Frame sent to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// Session accepted
    Ready,
    /// History cleared
    Cleared,
    Status(TurnStatus),
    /// Transcript or echoed typed input
    Text(String),
    Audio(SynthesizedAudio),
    Error(ConversationError),
}

impl OutboundFrame {
    /// Text carried by status-type frames.
    pub fn status_text(&self) -> Option<String> {
        match self {
            Self::Ready => Some("ready".to_string()),
            Self::Cleared => Some("cleared".to_string()),
            Self::Status(status) => Some(status.as_str().to_string()),
            Self::Error(error) => Some(format!("error: {error}")),
            Self::Text(_) | Self::Audio(_) => None,
        }
    }
}
