use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize, PartialEq)]
pub struct StatsResponse {
    pub rooms: usize,
    pub sessions: usize,
    pub uptime_ms: u64,
}

/// GET /stats
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let stats = state.registry.stats().await;
    Json(StatsResponse {
        rooms: stats.rooms,
        sessions: stats.sessions,
        uptime_ms: state.uptime_ms(),
    })
}

/// GET /version
pub async fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/version", get(get_version))
}
