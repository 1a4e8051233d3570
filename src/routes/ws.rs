//! WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::ws::ws_voice_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the voice conversation WebSocket router
///
/// # Endpoint
///
/// `GET /websocket` - WebSocket upgrade, one conversation session per connection
///
/// # Example
///
/// ```json
/// // Server greets the client
/// {"type": "status", "text": "ready"}
///
/// // Client sends audio as binary frames, or typed input
/// {"type": "text", "data": "What is the capital of France?"}
///
/// // Server answers
/// {"type": "text", "text": "What is the capital of France?"}
/// {"type": "status", "text": "generating"}
/// {"type": "status", "text": "speaking"}
/// {"type": "audio", "text": "The capital of France is Paris.", "audio": "<base64>"}
/// {"type": "status", "text": "idle"}
/// ```
///
/// The connection limit middleware is applied by the caller.
pub fn create_ws_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/websocket", get(ws_voice_handler))
        .layer(TraceLayer::new_for_http())
}
