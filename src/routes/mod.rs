pub mod api;
pub mod ws;

use axum::{Router, middleware};
use std::sync::Arc;

use crate::middleware::connection_limit_middleware;
use crate::state::AppState;

/// Combine the public routes and the WebSocket route.
///
/// Connection limits apply to the WebSocket route only. CORS, rate limiting
/// and security headers are layered on by the binary.
pub fn create_app_router(state: Arc<AppState>) -> Router {
    let ws_routes = ws::create_ws_router().layer(middleware::from_fn_with_state(
        state.clone(),
        connection_limit_middleware,
    ));

    api::create_api_router().merge(ws_routes).with_state(state)
}
