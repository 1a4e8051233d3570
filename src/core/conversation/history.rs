//! Per-session conversation state.
//!
//! Only the session coordinator mutates this record. Generation calls work
//! from a [`ConversationState::snapshot`] so a `clear` arriving mid-turn never
//! touches the messages an in-flight request was built from.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Where the session currently is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    #[default]
    Idle,
    Receiving,
    Transcribing,
    Generating,
    Speaking,
}

impl TurnStatus {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnStatus::Idle => "idle",
            TurnStatus::Receiving => "receiving",
            TurnStatus::Transcribing => "transcribing",
            TurnStatus::Generating => "generating",
            TurnStatus::Speaking => "speaking",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, TurnStatus::Idle)
    }
}

impl std::fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// History plus turn status for one connection.
///
/// `epoch` advances on every `clear`. A turn remembers the epoch it started
/// in and its entries are only recorded while that epoch is still current.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    history: Vec<ChatMessage>,
    status: TurnStatus,
    epoch: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Owned copy handed to a generation call.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.history.clone()
    }

    pub fn status(&self) -> TurnStatus {
        self.status
    }

    pub fn set_status(&mut self, status: TurnStatus) {
        self.status = status;
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Drop all history. Returns how many entries were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.history.len();
        self.history.clear();
        self.epoch += 1;
        removed
    }

    /// Append `message` if no `clear` happened since `epoch`.
    pub fn record(&mut self, epoch: u64, message: ChatMessage) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.history.push(message);
        true
    }
}
