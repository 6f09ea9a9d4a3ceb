//! Error types for the lifecycle subsystem.

use std::time::Duration;
use thiserror::Error;

/// Errors reported by a [`Server`](crate::lifecycle::Server) implementation.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The accept loop hit a non-transient error.
    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    /// Any other I/O failure inside the listener.
    #[error("listener I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Graceful shutdown did not finish before its deadline.
    #[error("graceful shutdown deadline exceeded")]
    DeadlineExceeded,

    /// The serve task ended without reporting a result (panic or abort).
    #[error("listener task terminated without reporting a result")]
    Terminated,

    /// Collaborator-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Terminal failure of a supervisor run.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The listener failed before any termination request was observed.
    #[error("listening and serving: {0}")]
    Listener(#[source] ServerError),

    /// In-flight work outlived the grace period; connections were force-closed.
    #[error("graceful shutdown exceeded grace period of {grace_period:?}, connections force-closed")]
    GracefulTimeout { grace_period: Duration },

    /// Graceful shutdown failed; connections were force-closed.
    #[error("gracefully shutting down server: {0}")]
    GracefulShutdown(#[source] ServerError),

    /// Forced close failed; termination could not be guaranteed.
    #[error("closing server: {0}")]
    ForceClose(#[source] ServerError),
}

impl LifecycleError {
    /// Stable label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::Listener(_) => "listener_failure",
            LifecycleError::GracefulTimeout { .. } => "graceful_timeout",
            LifecycleError::GracefulShutdown(_) => "graceful_error",
            LifecycleError::ForceClose(_) => "force_close_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_error_mentions_address() {
        let err = ServerError::Bind {
            address: "127.0.0.1:8000".into(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
        };
        let msg = err.to_string();
        assert!(msg.contains("127.0.0.1:8000"));
        assert!(msg.contains("address in use"));
    }

    #[test]
    fn lifecycle_error_kinds() {
        assert_eq!(LifecycleError::Listener(ServerError::Terminated).kind(), "listener_failure");
        assert_eq!(
            LifecycleError::GracefulTimeout { grace_period: Duration::from_secs(15) }.kind(),
            "graceful_timeout"
        );
        assert_eq!(
            LifecycleError::ForceClose(ServerError::Other("boom".into())).kind(),
            "force_close_error"
        );
    }
}
