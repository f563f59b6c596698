//! Listener handles.

use super::Shared;
use std::fmt;
use std::rc::Weak;

/// Handle returned by [`Interpreter::subscribe`](super::Interpreter::subscribe).
///
/// Dropping the handle keeps the listener registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[must_use = "dropping a subscription does not remove the listener"]
pub struct Subscription {
    id: u64,
    target: Weak<Shared>,
}

impl Subscription {
    pub(super) fn new(id: u64, target: Weak<Shared>) -> Self {
        Self { id, target }
    }

    /// Remove the listener. Returns `false` when it was already gone.
    pub fn unsubscribe(self) -> bool {
        self.target
            .upgrade()
            .is_some_and(|shared| shared.remove_listener(self.id))
    }

    /// Whether the listener is still registered with a live interpreter.
    pub fn is_active(&self) -> bool {
        self.target
            .upgrade()
            .is_some_and(|shared| shared.has_listener(self.id))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
