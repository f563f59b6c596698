//! Guard predicates for controlling state transitions.
//!
//! Guards are pure boolean functions that decide whether a candidate
//! transition may be taken. They see the context, the event being processed
//! and the metadata of the state the transition leaves.

use super::event::Event;
use super::value::{Context, Meta};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::rc::Rc;

/// Pure predicate that determines if a transition can be taken.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{Context, Event, Guard};
/// use serde_json::json;
///
/// let has_credit = Guard::new(|ctx: &Context, _: &Event, _| {
///     ctx.get("credit").and_then(|v| v.as_u64()).unwrap_or(0) > 0
/// });
///
/// let mut ctx = Context::new();
/// assert!(!has_credit.check(&ctx, &Event::new("BUY"), None));
///
/// ctx.insert("credit".into(), json!(5));
/// assert!(has_credit.check(&ctx, &Event::new("BUY"), None));
/// ```
#[derive(Clone)]
pub struct Guard {
    predicate: Rc<dyn Fn(&Context, &Event, Option<&Meta>) -> bool>,
}

impl Guard {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate should be deterministic: guards may be evaluated more
    /// than once for the same event.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Context, &Event, Option<&Meta>) -> bool + 'static,
    {
        Guard {
            predicate: Rc::new(predicate),
        }
    }

    /// Check if the guard allows the transition.
    pub fn check(&self, context: &Context, event: &Event, meta: Option<&Meta>) -> bool {
        (self.predicate)(context, event, meta)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}

/// Guard reference carried by a transition (`cond` on the wire).
#[derive(Clone, Debug)]
pub enum GuardRef {
    /// Resolved against the guard table when the machine is compiled.
    Named(String),
    Inline(Guard),
}

impl From<&str> for GuardRef {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<Guard> for GuardRef {
    fn from(guard: Guard) -> Self {
        Self::Inline(guard)
    }
}

impl<'de> Deserialize<'de> for GuardRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(GuardRef::Named)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(level: i64) -> Context {
        let mut ctx = Context::new();
        ctx.insert("level".into(), json!(level));
        ctx
    }

    #[test]
    fn guard_reads_context() {
        let guard = Guard::new(|c: &Context, _: &Event, _| c["level"].as_i64() > Some(2));

        assert!(guard.check(&ctx(3), &Event::new("E"), None));
        assert!(!guard.check(&ctx(1), &Event::new("E"), None));
    }

    #[test]
    fn guard_reads_event_payload() {
        let guard = Guard::new(|_, e: &Event, _| e.get("force").and_then(|v| v.as_bool()) == Some(true));

        assert!(guard.check(&ctx(0), &Event::new("E").with("force", true), None));
        assert!(!guard.check(&ctx(0), &Event::new("E"), None));
    }

    #[test]
    fn guard_reads_state_meta() {
        let guard = Guard::new(|_, _, meta: Option<&Meta>| meta.is_some_and(|m| m["skippable"] == json!(true)));
        let meta = json!({"skippable": true});

        assert!(guard.check(&ctx(0), &Event::new("SKIP"), Some(&meta)));
        assert!(!guard.check(&ctx(0), &Event::new("SKIP"), None));
    }

    #[test]
    fn guard_is_deterministic() {
        let guard = Guard::new(|c: &Context, _: &Event, _| c.contains_key("level"));
        let context = ctx(1);
        let event = Event::new("E");

        assert_eq!(
            guard.check(&context, &event, None),
            guard.check(&context, &event, None)
        );
    }

    #[test]
    fn named_guards_deserialize_from_strings() {
        let guard: GuardRef = serde_json::from_value(json!("isReady")).unwrap();
        assert!(matches!(guard, GuardRef::Named(name) if name == "isReady"));
    }
}
