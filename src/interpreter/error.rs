//! Interpreter status and child invocation errors.

use crate::builder::BuildError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of an interpreter. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterpreterStatus {
    NotStarted,
    Running,
    Stopped,
}

impl InterpreterStatus {
    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

/// Failure to produce a child machine for an invoke.
///
/// Never fatal to the parent: it is logged and routed to `onError`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InvokeError {
    #[error("Service '{0}' is not registered")]
    UnknownService(String),

    #[error("Child machine could not be built: {0}")]
    Build(#[from] BuildError),

    #[error("Child machine could not be created: {0}")]
    Failed(String),
}
