//! Administrative shutdown trigger.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::lifecycle::signals::{StopReason, TerminationSource};

/// In-process shutdown trigger.
///
/// Provides a broadcast channel; every receiver obtained from [`Shutdown::subscribe`]
/// is a [`TerminationSource`] that fires once [`Shutdown::trigger`] is called.
#[derive(Debug, Clone)]
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown trigger.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown request.
    ///
    /// Only triggers issued after subscribing are observed.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Request shutdown. Returns false if nobody is listening.
    pub fn trigger(&self) -> bool {
        self.tx.send(()).is_ok()
    }

    /// Number of sources still waiting for a request.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminationSource for broadcast::Receiver<()> {
    async fn wait(mut self) -> StopReason {
        match self.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) => {
                tracing::info!("Shutdown requested");
                StopReason::Requested
            }
            // Every trigger handle is gone; nobody can ask us to stop any more.
            Err(RecvError::Closed) => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_wakes_subscriber() {
        let shutdown = Shutdown::new();
        let source = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 1);

        assert!(shutdown.trigger());
        assert_eq!(source.wait().await, StopReason::Requested);
    }

    #[tokio::test]
    async fn repeated_triggers_still_deliver_one_request() {
        let shutdown = Shutdown::new();
        let source = shutdown.subscribe();

        shutdown.trigger();
        shutdown.trigger();
        assert_eq!(source.wait().await, StopReason::Requested);
    }

    #[tokio::test]
    async fn trigger_without_subscribers_reports_false() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.trigger());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_trigger_never_fires() {
        let shutdown = Shutdown::new();
        let source = shutdown.subscribe();
        drop(shutdown);

        let waited = tokio::time::timeout(Duration::from_secs(60), source.wait()).await;
        assert!(waited.is_err());
    }
}
