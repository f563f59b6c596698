//! Actions and context assignment.

use super::event::Event;
use super::value::{Context, Meta};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// Side-effecting action body: `(context, event, meta)`.
pub type ActionFn = Rc<dyn Fn(&Context, &Event, Option<&Meta>)>;

/// Whole-context transform returning the keys to overwrite.
pub type AssignFn = Rc<dyn Fn(&Context, &Event, Option<&Meta>) -> Context>;

/// Computes a single context key.
pub type PropertyFn = Rc<dyn Fn(&Context, &Event, Option<&Meta>) -> Value>;

/// An action reference as it appears in a state node or transition.
///
/// In JSON descriptors actions are always names; inline bodies and assigns are
/// attached from code.
#[derive(Clone)]
pub enum Action {
    /// Resolved against the action table when the machine is compiled.
    Named(String),
    Inline { name: String, exec: ActionFn },
    Assign(Assigner),
}

impl Action {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn inline<F>(name: impl Into<String>, exec: F) -> Self
    where
        F: Fn(&Context, &Event, Option<&Meta>) + 'static,
    {
        Self::Inline {
            name: name.into(),
            exec: Rc::new(exec),
        }
    }

    pub fn assign<F>(transform: F) -> Self
    where
        F: Fn(&Context, &Event, Option<&Meta>) -> Context + 'static,
    {
        Self::Assign(Assigner::Transform(Rc::new(transform)))
    }

    pub fn assign_properties(properties: Properties) -> Self {
        Self::Assign(Assigner::Properties(properties))
    }
}

impl From<&str> for Action {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Action::Named)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Inline { name, .. } => f.debug_tuple("Inline").field(name).finish(),
            Self::Assign(assigner) => f.debug_tuple("Assign").field(assigner).finish(),
        }
    }
}

/// Derives a new context from the previous one.
#[derive(Clone)]
pub enum Assigner {
    /// Returned keys are merged over the previous context.
    Transform(AssignFn),
    /// Each key is set to a constant or computed from the previous context.
    Properties(Properties),
}

impl Assigner {
    /// Produce the next context. `context` itself is never modified.
    pub fn apply(&self, context: &Context, event: &Event, meta: Option<&Meta>) -> Context {
        let mut next = context.clone();
        match self {
            Self::Transform(transform) => next.extend(transform(context, event, meta)),
            Self::Properties(properties) => {
                for (key, value) in &properties.entries {
                    let value = match value {
                        Property::Constant(value) => value.clone(),
                        Property::Computed(compute) => compute(context, event, meta),
                    };
                    next.insert(key.clone(), value);
                }
            }
        }
        next
    }
}

impl fmt::Debug for Assigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transform(_) => f.write_str("Transform(..)"),
            Self::Properties(properties) => f.debug_tuple("Properties").field(properties).finish(),
        }
    }
}

/// Per-key assignment map, applied in insertion order.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{Assigner, Context, Event, Properties};
/// use serde_json::json;
///
/// let assigner = Assigner::Properties(
///     Properties::new()
///         .set("status", "ready")
///         .compute("count", |ctx, _, _| json!(ctx["count"].as_i64().unwrap_or(0) + 1)),
/// );
///
/// let mut context = Context::new();
/// context.insert("count".into(), json!(1));
/// let next = assigner.apply(&context, &Event::new("TICK"), None);
///
/// assert_eq!(next["count"], json!(2));
/// assert_eq!(next["status"], json!("ready"));
/// ```
#[derive(Clone, Default)]
pub struct Properties {
    entries: Vec<(String, Property)>,
}

#[derive(Clone)]
enum Property {
    Constant(Value),
    Computed(PropertyFn),
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries
            .push((key.into(), Property::Constant(value.into())));
        self
    }

    pub fn compute<F>(mut self, key: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Context, &Event, Option<&Meta>) -> Value + 'static,
    {
        self.entries
            .push((key.into(), Property::Computed(Rc::new(compute))));
        self
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(key, _)| key))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(count: i64) -> Context {
        let mut ctx = Context::new();
        ctx.insert("count".into(), json!(count));
        ctx.insert("label".into(), json!("x"));
        ctx
    }

    #[test]
    fn transform_merges_over_previous_context() {
        let assigner = Assigner::Transform(Rc::new(|ctx: &Context, _: &Event, _: Option<&Meta>| {
            let mut partial = Context::new();
            partial.insert("count".into(), json!(ctx["count"].as_i64().unwrap() * 10));
            partial
        }));

        let next = assigner.apply(&context(4), &Event::new("E"), None);
        assert_eq!(next["count"], json!(40));
        assert_eq!(next["label"], json!("x"));
    }

    #[test]
    fn computed_properties_read_the_previous_context() {
        let assigner = Assigner::Properties(
            Properties::new()
                .set("count", 100)
                .compute("copy", |ctx, _, _| ctx["count"].clone()),
        );

        let next = assigner.apply(&context(1), &Event::new("E"), None);
        assert_eq!(next["count"], json!(100));
        assert_eq!(next["copy"], json!(1));
    }

    #[test]
    fn assigners_see_event_and_meta() {
        let assigner = Assigner::Properties(Properties::new().compute("seen", |_, event, meta| {
            json!([event.kind, meta.cloned().unwrap_or(Value::Null)])
        }));

        let meta = json!({"slot": 2});
        let next = assigner.apply(&Context::new(), &Event::new("GO"), Some(&meta));
        assert_eq!(next["seen"], json!(["GO", {"slot": 2}]));
    }

    #[test]
    fn actions_deserialize_from_names() {
        let actions: Vec<Action> = serde_json::from_value(json!(["track", "log"])).unwrap();
        assert!(matches!(&actions[0], Action::Named(n) if n == "track"));
        assert!(matches!(&actions[1], Action::Named(n) if n == "log"));
    }
}
