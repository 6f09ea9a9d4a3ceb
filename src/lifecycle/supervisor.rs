//! Lifecycle supervisor: one listener, one run.
//!
//! # State Machine
//! ```text
//! Starting → Running → ShuttingDown → Stopped
//!                │            └──────→ Failed
//!                └───────────────────→ Failed
//! ```
//!
//! # Design Decisions
//! - Exactly one termination trigger is consumed per run
//! - A listener failure skips the escalator entirely
//! - No retries and no restart; the caller decides what to do with the result

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::lifecycle::error::{LifecycleError, ServerError};
use crate::lifecycle::escalator::{ShutdownEscalator, ShutdownOutcome};
use crate::lifecycle::runner::ListenerRunner;
use crate::lifecycle::server::Server;
use crate::lifecycle::signals::{StopReason, TerminationSource};
use crate::observability::metrics;

/// How long the serve loop gets to return once the escalator is done.
const LISTENER_SETTLE: Duration = Duration::from_secs(1);

/// Supervisor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Starting,
    Running,
    ShuttingDown,
    Stopped,
    Failed,
}

impl SupervisorState {
    /// Whether `next` is a legal forward transition from `self`.
    pub fn can_transition_to(self, next: SupervisorState) -> bool {
        use SupervisorState::*;
        matches!(
            (self, next),
            (Starting, Running)
                | (Running, ShuttingDown)
                | (Running, Failed)
                | (ShuttingDown, Stopped)
                | (ShuttingDown, Failed)
        )
    }

    /// True for `Stopped` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, SupervisorState::Stopped | SupervisorState::Failed)
    }

    /// Numeric code exported as a gauge.
    pub fn code(self) -> u8 {
        match self {
            SupervisorState::Starting => 0,
            SupervisorState::Running => 1,
            SupervisorState::ShuttingDown => 2,
            SupervisorState::Stopped => 3,
            SupervisorState::Failed => 4,
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SupervisorState::Starting => "starting",
            SupervisorState::Running => "running",
            SupervisorState::ShuttingDown => "shutting_down",
            SupervisorState::Stopped => "stopped",
            SupervisorState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Whichever event ended the running phase.
enum Trigger {
    Listener(Result<(), ServerError>),
    External(StopReason),
}

/// Runs a [`Server`] until a listener failure or an external stop request,
/// then shuts it down within a fixed grace period.
pub struct Supervisor<S, T> {
    server: Arc<S>,
    address: String,
    source: T,
    escalator: ShutdownEscalator,
    state: watch::Sender<SupervisorState>,
}

impl<S, T> Supervisor<S, T>
where
    S: Server,
    T: TerminationSource,
{
    /// Create a supervisor for `server` listening on `address`.
    pub fn new(server: Arc<S>, address: impl Into<String>, grace_period: Duration, source: T) -> Self {
        let (state, _) = watch::channel(SupervisorState::Starting);
        Self {
            server,
            address: address.into(),
            source,
            escalator: ShutdownEscalator::new(grace_period),
            state,
        }
    }

    /// Observe state transitions.
    pub fn state(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    pub fn grace_period(&self) -> Duration {
        self.escalator.grace_period()
    }

    /// Run the listener to completion. Consumes the supervisor.
    pub async fn run(self) -> Result<(), LifecycleError> {
        let Supervisor { server, address, source, escalator, state } = self;

        tracing::info!(address = %address, "Starting listener");
        let mut runner = ListenerRunner::start(Arc::clone(&server), address);
        advance(&state, SupervisorState::Running);
        tracing::info!("Startup complete");

        let trigger = tokio::select! {
            result = runner.outcome() => Trigger::Listener(result),
            reason = source.wait() => Trigger::External(reason),
        };

        match trigger {
            Trigger::Listener(Err(e)) => {
                tracing::error!(error = %e, "Listener failed");
                runner.join().await;
                advance(&state, SupervisorState::Failed);
                Err(LifecycleError::Listener(e))
            }
            Trigger::Listener(Ok(())) => {
                tracing::warn!("Listener stopped without a shutdown request");
                runner.join().await;
                advance(&state, SupervisorState::ShuttingDown);
                advance(&state, SupervisorState::Stopped);
                Ok(())
            }
            Trigger::External(reason) => {
                tracing::info!(reason = %reason, "Shutting down");
                advance(&state, SupervisorState::ShuttingDown);

                let outcome = escalator.escalate(server.as_ref()).await;
                metrics::record_shutdown_outcome(outcome.label());
                runner.stop(LISTENER_SETTLE).await;

                let next = if outcome.is_success() {
                    SupervisorState::Stopped
                } else {
                    SupervisorState::Failed
                };
                advance(&state, next);
                outcome_result(outcome, escalator.grace_period())
            }
        }
    }
}

fn outcome_result(outcome: ShutdownOutcome, grace_period: Duration) -> Result<(), LifecycleError> {
    let result = outcome.into_result(grace_period);
    match &result {
        Ok(()) => tracing::info!("Shutdown complete"),
        Err(e) => tracing::error!(kind = e.kind(), error = %e, "Shutdown failed"),
    }
    result
}

/// Move `state` forward; backward or repeated transitions are refused.
fn advance(state: &watch::Sender<SupervisorState>, next: SupervisorState) {
    let applied = state.send_if_modified(|current| {
        if current.can_transition_to(next) {
            *current = next;
            true
        } else {
            false
        }
    });

    if applied {
        if next.is_terminal() {
            tracing::info!(state = %next, "Supervisor finished");
        } else {
            tracing::debug!(state = %next, "Supervisor state changed");
        }
        metrics::record_lifecycle_state(next.code());
    } else {
        tracing::error!(
            from = %*state.borrow(),
            to = %next,
            "Refused supervisor state transition"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_forward_only() {
        use SupervisorState::*;
        assert!(Starting.can_transition_to(Running));
        assert!(Running.can_transition_to(Failed));
        assert!(ShuttingDown.can_transition_to(Stopped));

        assert!(!Running.can_transition_to(Starting));
        assert!(!Stopped.can_transition_to(Running));
        assert!(!Failed.can_transition_to(ShuttingDown));
        assert!(!Starting.can_transition_to(Stopped));
        assert!(!Running.can_transition_to(Running));
    }

    #[test]
    fn advance_refuses_backward_moves() {
        let (tx, rx) = watch::channel(SupervisorState::Starting);
        advance(&tx, SupervisorState::Running);
        advance(&tx, SupervisorState::Failed);
        advance(&tx, SupervisorState::Running);
        assert_eq!(*rx.borrow(), SupervisorState::Failed);
        assert!(rx.borrow().is_terminal());
    }
}
