//! WebSocket upgrade and per-connection session loop

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use axum::{
    Extension,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::conversation::{InboundFrame, OutboundFrame, SessionCoordinator};
use crate::middleware::ClientIp;
use crate::state::AppState;

use super::messages::OutgoingMessage;

/// Outbound frames buffered between the session and the socket writer
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// How long queued frames may take to flush after the session ends
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Voice conversation WebSocket handler
///
/// Upgrades the connection and runs one conversation session on it.
/// `ClientIp` is present when the connection-limit middleware reserved a
/// slot; it is released when the session ends.
pub async fn ws_voice_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    client_ip: Option<Extension<ClientIp>>,
) -> Response {
    let client_ip = client_ip.map(|Extension(ip)| ip);
    info!(ip = ?client_ip.map(|c| c.0), "WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_voice_socket(socket, state, client_ip))
}

async fn handle_voice_socket(socket: WebSocket, state: Arc<AppState>, client_ip: Option<ClientIp>) {
    let session_id = Uuid::new_v4().to_string();
    info!(session_id = %session_id, "WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<OutboundFrame>(CHANNEL_BUFFER_SIZE);

    let writer_session = session_id.clone();
    let mut sender_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            let message = OutgoingMessage::from(&frame);
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!(session_id = %writer_session, "Failed to serialize outgoing message: {}", e);
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(json.into())).await {
                debug!(session_id = %writer_session, "Failed to send WebSocket message: {}", e);
                break;
            }
        }
        let _ = sender.close().await;
    });

    let reader_session = session_id.clone();
    let inbound = Box::pin(stream! {
        while let Some(message) = receiver.next().await {
            match message {
                Ok(Message::Text(text)) => yield InboundFrame::Text(text.as_str().to_owned()),
                Ok(Message::Binary(data)) => yield InboundFrame::Binary(data),
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    info!(session_id = %reader_session, "WebSocket connection closed by client");
                    break;
                }
                Err(e) => {
                    warn!(session_id = %reader_session, "WebSocket error: {}", e);
                    break;
                }
            }
        }
    });

    let coordinator = SessionCoordinator::new(
        session_id.clone(),
        state.collaborators.clone(),
        state.session_settings.clone(),
        outbound_tx,
        CancellationToken::new(),
    );
    let final_state = coordinator.run(inbound).await;

    // The coordinator owned the last outbound sender; let queued frames flush.
    if tokio::time::timeout(FLUSH_TIMEOUT, &mut sender_task).await.is_err() {
        warn!(session_id = %session_id, "Timed out flushing outbound frames");
        sender_task.abort();
    }

    if let Some(ClientIp(ip)) = client_ip {
        state.release_connection(ip);
    }

    info!(
        session_id = %session_id,
        history = final_state.history().len(),
        "WebSocket session terminated"
    );
}
