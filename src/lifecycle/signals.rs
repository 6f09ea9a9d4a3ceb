//! Termination sources.
//!
//! # Responsibilities
//! - Register OS signal handlers (SIGINT, SIGTERM) at construction time
//! - Deliver exactly one stop request to the supervisor
//! - Combine several sources into one (first to fire wins)
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A source is consumed when awaited, so a second signal cannot be observed
//! - A source whose sender side is gone never fires

use std::fmt;
use std::future::Future;

/// Why an external stop was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// SIGINT / Ctrl+C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// Administrative request from inside the process.
    Requested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Interrupt => write!(f, "interrupt"),
            StopReason::Terminate => write!(f, "terminate"),
            StopReason::Requested => write!(f, "requested"),
        }
    }
}

/// A one-shot producer of an external stop request.
pub trait TerminationSource: Send + 'static {
    /// Wait for the stop request. Consumes the source.
    fn wait(self) -> impl Future<Output = StopReason> + Send;

    /// Race this source against `other`.
    fn or<B>(self, other: B) -> FirstOf<Self, B>
    where
        Self: Sized,
        B: TerminationSource,
    {
        FirstOf { first: self, second: other }
    }
}

/// Two termination sources raced against each other.
pub struct FirstOf<A, B> {
    first: A,
    second: B,
}

impl<A, B> TerminationSource for FirstOf<A, B>
where
    A: TerminationSource,
    B: TerminationSource,
{
    async fn wait(self) -> StopReason {
        tokio::select! {
            reason = self.first.wait() => reason,
            reason = self.second.wait() => reason,
        }
    }
}

/// SIGINT and SIGTERM.
pub struct OsSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl OsSignals {
    /// Install the signal handlers. Signals arriving after this call are not lost.
    #[cfg(unix)]
    pub fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {})
    }
}

impl TerminationSource for OsSignals {
    #[cfg(unix)]
    async fn wait(mut self) -> StopReason {
        let reason = tokio::select! {
            _ = self.interrupt.recv() => StopReason::Interrupt,
            _ = self.terminate.recv() => StopReason::Terminate,
        };
        tracing::info!(signal = %reason, "Caught signal, shutting down");
        reason
    }

    #[cfg(not(unix))]
    async fn wait(self) -> StopReason {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!(signal = %StopReason::Interrupt, "Caught signal, shutting down");
        StopReason::Interrupt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Never;

    impl TerminationSource for Never {
        async fn wait(self) -> StopReason {
            std::future::pending().await
        }
    }

    struct After(Duration, StopReason);

    impl TerminationSource for After {
        async fn wait(self) -> StopReason {
            tokio::time::sleep(self.0).await;
            self.1
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_of_takes_the_earliest_source() {
        let source = After(Duration::from_secs(5), StopReason::Terminate)
            .or(After(Duration::from_secs(1), StopReason::Requested));
        assert_eq!(source.wait().await, StopReason::Requested);
    }

    #[tokio::test(start_paused = true)]
    async fn first_of_ignores_a_source_that_never_fires() {
        let source = Never.or(After(Duration::from_secs(3), StopReason::Interrupt));
        assert_eq!(source.wait().await, StopReason::Interrupt);
    }

    #[test]
    fn stop_reason_display() {
        assert_eq!(StopReason::Terminate.to_string(), "terminate");
        assert_eq!(StopReason::Requested.to_string(), "requested");
    }
}
