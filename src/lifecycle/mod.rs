//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Supervisor::run (supervisor.rs):
//!     runner.rs spawns Server::serve ──┐
//!                                      ├─ first event wins
//!     signals.rs / shutdown.rs ────────┘
//!
//!     listener failure → Failed (no shutdown)
//!     stop request     → escalator.rs: graceful drain → forced close
//! ```
//!
//! # Design Decisions
//! - One listener per supervisor, one run per supervisor
//! - Shutdown has a deadline: forced close after the grace period
//! - Every terminal condition is returned to the caller; nothing is retried

pub mod error;
pub mod escalator;
pub mod runner;
pub mod server;
pub mod shutdown;
pub mod signals;
pub mod supervisor;

pub use error::{LifecycleError, ServerError};
pub use escalator::{ShutdownEscalator, ShutdownOutcome};
pub use runner::ListenerRunner;
pub use server::Server;
pub use shutdown::Shutdown;
pub use signals::{FirstOf, OsSignals, StopReason, TerminationSource};
pub use supervisor::{Supervisor, SupervisorState};
