//! Administrative endpoints.
//!
//! # Data Flow
//! ```text
//! POST /admin/shutdown
//!     → auth.rs (Bearer token check)
//!     → handlers.rs (trigger lifecycle::Shutdown)
//!     → Supervisor observes the request and starts shutdown
//! ```
//!
//! # Design Decisions
//! - Disabled unless configured with an API key
//! - Responds before the drain starts; the request itself is in-flight work

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::post, Router};
use std::sync::Arc;

use crate::lifecycle::Shutdown;

/// State shared by the admin routes.
#[derive(Clone)]
pub struct AdminState {
    pub shutdown: Shutdown,
    pub api_key: Arc<str>,
}

/// `POST /admin/shutdown`, guarded by `api_key`.
pub fn routes(shutdown: Shutdown, api_key: &str) -> Router {
    let state = AdminState {
        shutdown,
        api_key: Arc::from(api_key),
    };

    Router::new()
        .route("/admin/shutdown", post(handlers::post_shutdown))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::admin_auth_middleware))
        .with_state(state)
}
