//! The capability contract between the supervisor and a network server.
//!
//! # Responsibilities
//! - `serve`: run the accept loop until closed or failed
//! - `shutdown`: stop accepting and drain in-flight work up to a deadline
//! - `force_close`: hard-stop every connection and release the listener
//!
//! # Design Decisions
//! - The supervisor never touches sockets; it only drives this trait
//! - `serve` is called once per run, from the listener runner's task
//! - `shutdown` and `force_close` are called from the supervisor's task while
//!   `serve` is still running, so implementations share state internally

use std::future::Future;
use tokio::time::Instant;

use crate::lifecycle::error::ServerError;

/// A server whose lifetime is driven by the [`Supervisor`](crate::lifecycle::Supervisor).
pub trait Server: Send + Sync + 'static {
    /// Bind `address` and serve until the listener is closed.
    ///
    /// Returns `Ok(())` only after a close triggered by [`shutdown`](Server::shutdown)
    /// or [`force_close`](Server::force_close); any other exit is an error.
    fn serve(&self, address: &str) -> impl Future<Output = Result<(), ServerError>> + Send;

    /// Stop accepting new connections and wait for in-flight work until `deadline`.
    fn shutdown(&self, deadline: Instant) -> impl Future<Output = Result<(), ServerError>> + Send;

    /// Terminate all connections immediately. Must not block.
    fn force_close(&self) -> Result<(), ServerError>;
}
