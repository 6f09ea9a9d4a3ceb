//! Operational HTTP handlers.

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::net::ConnectionTracker;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub open_connections: u64,
}

pub async fn get_health(State(tracker): State<ConnectionTracker>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        open_connections: tracker.open_count(),
    })
}

/// `GET /health`.
pub fn routes(tracker: ConnectionTracker) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .with_state(tracker)
}
