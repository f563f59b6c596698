//! Errors raised while resolving transitions.

use thiserror::Error;

/// Fatal errors: the machine was asked about a state it does not have.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MachineError {
    #[error("State '{state}' not found on machine '{machine}'")]
    UnknownState { machine: String, state: String },

    #[error("Region '{region}' missing from the value of machine '{machine}'")]
    MissingRegion { machine: String, region: String },

    #[error("Value '{value}' does not fit the shape of machine '{machine}'")]
    UnexpectedValue { machine: String, value: String },
}
