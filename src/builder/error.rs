//! Build errors for machine construction.

use thiserror::Error;

/// Errors that can occur when compiling a machine.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error("Machine identifier not specified. Set `id` before registering the machine")]
    MissingMachineId,

    #[error("Initial state not specified for machine '{machine}'")]
    MissingInitialState { machine: String },

    #[error("Machine '{machine}' has {} invalid definition(s): {}", .issues.len(), render(.issues))]
    InvalidDefinition {
        machine: String,
        issues: Vec<DefinitionIssue>,
    },
}

impl BuildError {
    /// Issues collected while validating the definition, if any.
    pub fn issues(&self) -> &[DefinitionIssue] {
        match self {
            Self::InvalidDefinition { issues, .. } => issues,
            _ => &[],
        }
    }
}

fn render(issues: &[DefinitionIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single problem found while resolving a descriptor.
///
/// Every issue in a descriptor is reported at once rather than stopping at
/// the first one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DefinitionIssue {
    #[error("initial state '{state}' is not defined")]
    UnknownInitial { state: String },

    #[error("region '{region}' has no initial state")]
    MissingRegionInitial { region: String },

    #[error("transition from '{state}' on '{event}' targets unknown state '{target}'")]
    UnknownTarget {
        state: String,
        event: String,
        target: String,
    },

    #[error("action '{action}' used in '{state}' is not implemented")]
    UnknownAction { state: String, action: String },

    #[error("guard '{guard}' used in '{state}' is not implemented")]
    UnknownGuard { state: String, guard: String },

    #[error("delay '{delay}' used in '{state}' is neither a number nor a named delay")]
    UnknownDelay { state: String, delay: String },

    #[error("invoke id '{id}' is declared twice in '{state}'")]
    DuplicateInvoke { state: String, id: String },

    #[error("'{state}' uses {feature}, which is only supported at the top level of a flat machine")]
    Unsupported {
        state: String,
        feature: &'static str,
    },
}
