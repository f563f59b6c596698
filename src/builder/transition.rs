//! Builder for constructing transitions.

use crate::config::TransitionConfig;
use crate::core::{Action, Context, Event, Guard, GuardRef, Meta};

/// Builder for constructing transitions with a fluent API.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::TransitionBuilder;
///
/// let transition = TransitionBuilder::new()
///     .to("playing")
///     .action("emitPlay")
///     .guard_named("canPlay")
///     .build();
///
/// assert_eq!(transition.target.as_deref(), Some("playing"));
/// assert_eq!(transition.actions.len(), 1);
/// ```
#[derive(Default)]
pub struct TransitionBuilder {
    target: Option<String>,
    actions: Vec<Action>,
    guard: Option<GuardRef>,
}

impl TransitionBuilder {
    /// Create a new transition builder. Without [`to`](Self::to) the
    /// transition is targetless.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target state.
    pub fn to(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Append an action.
    pub fn action(mut self, action: impl Into<Action>) -> Self {
        self.actions.push(action.into());
        self
    }

    /// Append an assign computing a partial context.
    pub fn assign<F>(self, transform: F) -> Self
    where
        F: Fn(&Context, &Event, Option<&Meta>) -> Context + 'static,
    {
        self.action(Action::assign(transform))
    }

    /// Add a guard predicate.
    pub fn guard(mut self, guard: Guard) -> Self {
        self.guard = Some(GuardRef::Inline(guard));
        self
    }

    /// Add a guard using a closure.
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&Context, &Event, Option<&Meta>) -> bool + 'static,
    {
        self.guard(Guard::new(predicate))
    }

    /// Reference a guard from the implementation bundle.
    pub fn guard_named(mut self, name: impl Into<String>) -> Self {
        self.guard = Some(GuardRef::Named(name.into()));
        self
    }

    pub fn build(self) -> TransitionConfig {
        TransitionConfig {
            target: self.target,
            actions: self.actions,
            cond: self.guard,
        }
    }
}

impl From<TransitionBuilder> for TransitionConfig {
    fn from(builder: TransitionBuilder) -> Self {
        builder.build()
    }
}
