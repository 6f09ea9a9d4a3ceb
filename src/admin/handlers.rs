use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ShutdownResponse {
    pub status: String,
}

/// Ask the supervisor to shut down.
pub async fn post_shutdown(State(state): State<AdminState>) -> (StatusCode, Json<ShutdownResponse>) {
    if state.shutdown.trigger() {
        tracing::info!("Shutdown requested via admin endpoint");
        (
            StatusCode::ACCEPTED,
            Json(ShutdownResponse { status: "shutting_down".to_string() }),
        )
    } else {
        // The supervisor already consumed its termination source.
        (
            StatusCode::CONFLICT,
            Json(ShutdownResponse { status: "already_shutting_down".to_string() }),
        )
    }
}
