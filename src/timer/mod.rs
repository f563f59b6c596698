//! Pausable timers and the coordinator that groups them.
//!
//! Delayed transitions are the only place the runtime waits on time. Every
//! delay goes through a [`Timer`], every timer belongs to a
//! [`TimerCoordinator`], and the coordinator hands the actual waiting to a
//! [`Scheduler`] backend.

mod coordinator;
mod error;
mod scheduler;
#[allow(clippy::module_inception)]
mod timer;

pub use coordinator::TimerCoordinator;
pub use error::TimerError;
pub use scheduler::{ManualScheduler, Scheduler, TaskId};
#[cfg(feature = "tokio")]
pub use scheduler::TokioScheduler;
pub use timer::{Completion, Timer, TimerStatus};
