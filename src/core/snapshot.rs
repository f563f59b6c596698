//! Results of a transition.

use super::action::ActionFn;
use super::event::Event;
use super::value::{Context, Meta, StateValue};
use std::fmt;
use std::rc::Rc;

/// A non-assign action produced by a transition, bound to the metadata of the
/// state it belongs to.
#[derive(Clone)]
pub struct BoundAction {
    pub(crate) name: String,
    pub(crate) exec: ActionFn,
    pub(crate) meta: Option<Meta>,
}

impl BoundAction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }

    /// Run the action body.
    pub fn execute(&self, context: &Context, event: &Event) {
        (self.exec)(context, event, self.meta.as_ref())
    }
}

impl fmt::Debug for BoundAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundAction")
            .field("name", &self.name)
            .field("meta", &self.meta)
            .finish()
    }
}

/// Machine state after a transition.
///
/// Snapshots are plain values: computing one never runs an action. The
/// interpreter executes [`actions`](Self::actions) when it commits a snapshot.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub value: StateValue,
    /// Shared with the input snapshot when no assign ran.
    pub context: Rc<Context>,
    pub meta: Option<Meta>,
    pub actions: Vec<BoundAction>,
    pub changed: bool,
}

impl Snapshot {
    /// Snapshot that keeps value and context untouched.
    pub(crate) fn unchanged(value: StateValue, context: &Rc<Context>, meta: Option<&Meta>) -> Self {
        Self {
            value,
            context: Rc::clone(context),
            meta: meta.cloned(),
            actions: Vec::new(),
            changed: false,
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        self.value.matches(key)
    }

    /// Names of the actions waiting to be executed.
    pub fn action_names(&self) -> Vec<&str> {
        self.actions.iter().map(BoundAction::name).collect()
    }
}
