//! Sales API service library.
//!
//! The heart of the crate is [`lifecycle::Supervisor`], which runs one HTTP
//! listener until it fails or an external stop request arrives, then shuts it
//! down within a bounded grace period.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::{LifecycleError, Shutdown, Supervisor};
