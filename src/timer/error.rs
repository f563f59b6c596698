//! Timer error types.

use thiserror::Error;

/// Errors returned when a timer can no longer honour a request.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("The timer has been destroyed and cannot be started")]
    Destroyed,

    #[error("The timer has already fired")]
    AlreadyFired,
}
