//! Listener runner: the serve loop on its own task.
//!
//! # Responsibilities
//! - Spawn `Server::serve` without blocking the caller
//! - Publish the serve result exactly once on a one-shot channel
//! - Tear the task down when the supervisor is done with it

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::lifecycle::error::ServerError;
use crate::lifecycle::server::Server;

/// Handle to a running serve loop.
pub struct ListenerRunner {
    result_rx: oneshot::Receiver<Result<(), ServerError>>,
    handle: JoinHandle<()>,
}

impl ListenerRunner {
    /// Spawn the serve loop for `address`. Returns immediately.
    pub fn start<S: Server>(server: Arc<S>, address: String) -> Self {
        let (result_tx, result_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let result = server.serve(&address).await;
            if let Err(e) = &result {
                tracing::debug!(address = %address, error = %e, "Serve loop returned an error");
            }
            // The supervisor may already have stopped listening.
            let _ = result_tx.send(result);
        });

        Self { result_rx, handle }
    }

    /// Wait for the serve loop's terminal result.
    ///
    /// Cancel-safe: dropping the future before it resolves loses nothing.
    pub async fn outcome(&mut self) -> Result<(), ServerError> {
        match (&mut self.result_rx).await {
            Ok(result) => result,
            Err(_) => Err(ServerError::Terminated),
        }
    }

    /// Give the serve loop `settle` to return after a shutdown, then abort it.
    pub async fn stop(mut self, settle: Duration) {
        match tokio::time::timeout(settle, self.outcome()).await {
            Ok(Ok(())) => tracing::debug!("Serve loop exited"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Serve loop exited with an error during shutdown"),
            Err(_) => {
                tracing::warn!(settle = ?settle, "Serve loop did not exit after shutdown, aborting");
                self.handle.abort();
            }
        }
        // Cancelled or finished; either way the task no longer runs after this.
        let _ = self.handle.await;
    }

    /// Release a runner whose serve loop has already reported.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}
