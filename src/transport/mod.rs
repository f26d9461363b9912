use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::server::AppState;

pub mod http_server;
pub mod websocket_server;

/// Websocket endpoint at the configured path plus the HTTP routes.
pub fn app(state: Arc<AppState>) -> Router {
    let ws_path = state.config.server.route_path();
    Router::new()
        .route(&ws_path, get(websocket_server::websocket_handler))
        .merge(http_server::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
