//! Voice conversation WebSocket
//!
//! One connection is one session. The handler maps WebSocket messages to
//! [`InboundFrame`](crate::core::conversation::InboundFrame)s, runs a
//! [`SessionCoordinator`](crate::core::conversation::SessionCoordinator)
//! and serializes its output frames as JSON.
//!
//! ## Client → Server
//!
//! - **Binary frames**: one complete audio chunk, starts a turn
//! - `{"type":"cmd","data":"clear"}`: forget the conversation history
//! - `{"type":"text","data":"..."}`: typed user input, starts a turn
//!
//! ## Server → Client
//!
//! - `{"type":"status","text":"ready" | "idle" | "receiving" | "transcribing" | "generating" | "speaking" | "cleared" | "error: ..."}`
//! - `{"type":"text","text":"<transcript>"}`
//! - `{"type":"audio","text":"<sentence>","audio":"<base64>"}`

mod handler;
pub mod messages;

pub use handler::ws_voice_handler;
