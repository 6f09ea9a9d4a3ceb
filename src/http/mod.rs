//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::listener)
//!     → server.rs (hyper connection, graceful watcher, connection task)
//!     → request.rs (request ID, request span)
//!     → handlers.rs / application routes
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
