//! Two-tier shutdown: graceful drain, then forced close.
//!
//! # Algorithm
//! ```text
//! deadline = now + grace_period, clamped far out on overflow
//! shutdown(deadline) bounded by deadline
//!     Ok           → GracefulSuccess
//!     timeout/err  → force_close()
//!                        Ok  → GracefulTimeout | GracefulError(cause)
//!                        Err → ForceCloseError(err)
//! ```
//!
//! # Design Decisions
//! - The escalator enforces the deadline itself; a server that ignores it
//!   still gets force-closed on time
//! - Forced close is attempted exactly once; there is no third tier

use std::time::Duration;
use tokio::time::{self, Instant};

use crate::lifecycle::error::{LifecycleError, ServerError};
use crate::lifecycle::server::Server;

/// Result of a shutdown sequence.
#[derive(Debug)]
pub enum ShutdownOutcome {
    /// In-flight work drained before the deadline.
    GracefulSuccess,
    /// The deadline passed; connections were force-closed.
    GracefulTimeout,
    /// Graceful shutdown failed; connections were force-closed.
    GracefulError(ServerError),
    /// Forced close failed.
    ForceCloseError(ServerError),
}

impl ShutdownOutcome {
    /// True only for [`ShutdownOutcome::GracefulSuccess`].
    pub fn is_success(&self) -> bool {
        matches!(self, ShutdownOutcome::GracefulSuccess)
    }

    /// Stable label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ShutdownOutcome::GracefulSuccess => "graceful_success",
            ShutdownOutcome::GracefulTimeout => "graceful_timeout",
            ShutdownOutcome::GracefulError(_) => "graceful_error",
            ShutdownOutcome::ForceCloseError(_) => "force_close_error",
        }
    }

    /// Map to the supervisor's run result.
    pub fn into_result(self, grace_period: Duration) -> Result<(), LifecycleError> {
        match self {
            ShutdownOutcome::GracefulSuccess => Ok(()),
            ShutdownOutcome::GracefulTimeout => Err(LifecycleError::GracefulTimeout { grace_period }),
            ShutdownOutcome::GracefulError(e) => Err(LifecycleError::GracefulShutdown(e)),
            ShutdownOutcome::ForceCloseError(e) => Err(LifecycleError::ForceClose(e)),
        }
    }
}

/// Deadlines that overflow `Instant` are clamped to roughly 30 years out.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(grace_period: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(grace_period)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Why the graceful tier gave up.
enum GracefulFailure {
    Timeout,
    Error(ServerError),
}

/// Drives a [`Server`] through graceful shutdown with a forced-close fallback.
#[derive(Debug, Clone, Copy)]
pub struct ShutdownEscalator {
    grace_period: Duration,
}

impl ShutdownEscalator {
    pub fn new(grace_period: Duration) -> Self {
        Self { grace_period }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Run the shutdown sequence against `server`.
    pub async fn escalate<S: Server>(&self, server: &S) -> ShutdownOutcome {
        let deadline = deadline_after(self.grace_period);

        tracing::info!(grace_period = ?self.grace_period, "Starting graceful shutdown");

        let failure = match time::timeout_at(deadline, server.shutdown(deadline)).await {
            Ok(Ok(())) => {
                tracing::info!("Graceful shutdown complete");
                return ShutdownOutcome::GracefulSuccess;
            }
            Ok(Err(ServerError::DeadlineExceeded)) | Err(_) => {
                tracing::warn!(grace_period = ?self.grace_period, "Graceful shutdown timed out");
                GracefulFailure::Timeout
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Gracefully shutting down server failed");
                GracefulFailure::Error(e)
            }
        };

        match server.force_close() {
            Ok(()) => {
                tracing::warn!("Server force-closed");
                match failure {
                    GracefulFailure::Timeout => ShutdownOutcome::GracefulTimeout,
                    GracefulFailure::Error(e) => ShutdownOutcome::GracefulError(e),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Closing server failed");
                ShutdownOutcome::ForceCloseError(e)
            }
        }
    }
}
