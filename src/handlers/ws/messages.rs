//! Wire format of server to client messages

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Serialize;

use crate::core::conversation::OutboundFrame;

/// JSON message sent to the client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutgoingMessage {
    /// Session state, acknowledgements and errors
    Status { text: String },
    /// Transcript of the user's audio or echoed typed input
    Text { text: String },
    /// One synthesized sentence
    Audio {
        text: String,
        /// Base64-encoded audio in the synthesizer's native format
        audio: String,
    },
}

impl From<&OutboundFrame> for OutgoingMessage {
    fn from(frame: &OutboundFrame) -> Self {
        match frame {
            OutboundFrame::Text(text) => Self::Text { text: text.clone() },
            OutboundFrame::Audio(audio) => Self::Audio {
                text: audio.text.clone(),
                audio: STANDARD.encode(&audio.audio),
            },
            status => Self::Status {
                text: status.status_text().unwrap_or_default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversation::{ConversationError, SynthesizedAudio, TurnStatus};
    use crate::core::tts::TTSError;
    use bytes::Bytes;
    use serde_json::{Value, json};

    fn wire(frame: OutboundFrame) -> Value {
        serde_json::to_value(OutgoingMessage::from(&frame)).unwrap()
    }

    #[test]
    fn test_status_frames() {
        assert_eq!(wire(OutboundFrame::Ready), json!({"type": "status", "text": "ready"}));
        assert_eq!(wire(OutboundFrame::Cleared), json!({"type": "status", "text": "cleared"}));
        assert_eq!(
            wire(OutboundFrame::Status(TurnStatus::Transcribing)),
            json!({"type": "status", "text": "transcribing"})
        );
    }

    #[test]
    fn test_error_frame_is_status() {
        let frame = OutboundFrame::Error(ConversationError::Synthesis {
            sequence: 2,
            source: TTSError::ProviderError("rate limited".to_string()),
        });
        let value = wire(frame);
        assert_eq!(value["type"], "status");
        let text = value["text"].as_str().unwrap();
        assert!(text.starts_with("error: "));
        assert!(text.contains("fragment 2"));
    }

    #[test]
    fn test_text_frame() {
        assert_eq!(
            wire(OutboundFrame::Text("what time is it".to_string())),
            json!({"type": "text", "text": "what time is it"})
        );
    }

    #[test]
    fn test_audio_frame_is_base64() {
        let frame = OutboundFrame::Audio(SynthesizedAudio {
            sequence: 0,
            text: "Hello.".to_string(),
            audio: Bytes::from_static(&[0, 1, 2, 255]),
        });
        assert_eq!(
            wire(frame),
            json!({"type": "audio", "text": "Hello.", "audio": "AAEC/w=="})
        );
    }
}
