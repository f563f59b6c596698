//! Builder API for ergonomic machine construction.
//!
//! This module provides the implementation bundle that backs the names in a
//! descriptor, fluent builders for descriptors written in code, and the
//! errors raised when a machine cannot be compiled.

pub mod error;
pub mod implementations;
pub mod machine;
pub mod transition;

pub use error::{BuildError, DefinitionIssue};
pub use implementations::{ActionImpl, DelayFn, Implementations, ServiceRegistry};
pub use machine::{MachineBuilder, StateBuilder};
pub use transition::TransitionBuilder;

use crate::config::TransitionConfig;
use crate::core::{Action, Context, Event, Meta, Properties};

/// Create an assign action from a whole-context transform.
///
/// # Example
///
/// ```
/// use statecraft::builder::assign;
/// use statecraft::core::{Action, Context};
/// use serde_json::json;
///
/// let bump = assign(|ctx, _, _| {
///     let mut partial = Context::new();
///     partial.insert("count".into(), json!(ctx["count"].as_i64().unwrap_or(0) + 1));
///     partial
/// });
/// assert!(matches!(bump, Action::Assign(_)));
/// ```
pub fn assign<F>(transform: F) -> Action
where
    F: Fn(&Context, &Event, Option<&Meta>) -> Context + 'static,
{
    Action::assign(transform)
}

/// Create an assign action from a per-key map.
pub fn assign_properties(properties: Properties) -> Action {
    Action::assign_properties(properties)
}

/// Create an unconditional transition to `target`.
pub fn simple_transition(target: impl Into<String>) -> TransitionConfig {
    TransitionBuilder::new().to(target).build()
}

/// Create a transition to `target` gated by a predicate.
///
/// # Example
///
/// ```
/// use statecraft::builder::guarded_transition;
///
/// let transition = guarded_transition("playing", |ctx, _, _| ctx.contains_key("src"));
/// assert_eq!(transition.target.as_deref(), Some("playing"));
/// assert!(transition.cond.is_some());
/// ```
pub fn guarded_transition<F>(target: impl Into<String>, guard: F) -> TransitionConfig
where
    F: Fn(&Context, &Event, Option<&Meta>) -> bool + 'static,
{
    TransitionBuilder::new().to(target).when(guard).build()
}
