//! Child invocation descriptors.

use super::transition::TransitionConfig;
use crate::core::{Context, Event};
use crate::interpreter::InvokeError;
use crate::machine::Machine;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::rc::Rc;

/// Builds a child machine from a context and the init event.
///
/// Both inline `src` factories and registered services have this shape.
pub type MachineFactory = Rc<dyn Fn(&Context, &Event) -> Result<Machine, InvokeError>>;

/// Derives the child context from the parent context.
pub type DataFn = Rc<dyn Fn(&Context, &Event) -> Context>;

/// A child interpreter owned by a state while it is active.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeConfig {
    /// Unique within the invoking state.
    pub id: String,
    pub src: InvokeSource,
    #[serde(default)]
    pub data: Option<InvokeData>,
    #[serde(default)]
    pub on_done: Option<InvokeReaction>,
    #[serde(default)]
    pub on_error: Option<InvokeReaction>,
}

impl InvokeConfig {
    /// Invoke a service from the registry.
    pub fn service(id: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            src: InvokeSource::Service(service.into()),
            data: None,
            on_done: None,
            on_error: None,
        }
    }

    /// Invoke an inline factory, called with the parent context.
    pub fn factory<F>(id: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Context, &Event) -> Result<Machine, InvokeError> + 'static,
    {
        Self {
            id: id.into(),
            src: InvokeSource::Factory(Rc::new(factory)),
            data: None,
            on_done: None,
            on_error: None,
        }
    }

    pub fn data(mut self, data: Context) -> Self {
        self.data = Some(InvokeData::Value(data));
        self
    }

    pub fn derive_data<F>(mut self, derive: F) -> Self
    where
        F: Fn(&Context, &Event) -> Context + 'static,
    {
        self.data = Some(InvokeData::Derive(Rc::new(derive)));
        self
    }

    pub fn on_done(mut self, reaction: impl Into<InvokeReaction>) -> Self {
        self.on_done = Some(reaction.into());
        self
    }

    pub fn on_error(mut self, reaction: impl Into<InvokeReaction>) -> Self {
        self.on_error = Some(reaction.into());
        self
    }
}

impl fmt::Debug for InvokeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokeConfig")
            .field("id", &self.id)
            .field("src", &self.src)
            .field("on_done", &self.on_done)
            .field("on_error", &self.on_error)
            .finish()
    }
}

#[derive(Clone)]
pub enum InvokeSource {
    /// Name looked up in the service registry when the state is entered.
    Service(String),
    Factory(MachineFactory),
}

impl<'de> Deserialize<'de> for InvokeSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(InvokeSource::Service)
    }
}

impl fmt::Debug for InvokeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service(name) => f.debug_tuple("Service").field(name).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Context handed to a registered service.
#[derive(Clone)]
pub enum InvokeData {
    Value(Context),
    Derive(DataFn),
}

impl InvokeData {
    pub fn resolve(&self, parent: &Context, event: &Event) -> Context {
        match self {
            Self::Value(context) => context.clone(),
            Self::Derive(derive) => derive(parent, event),
        }
    }
}

impl<'de> Deserialize<'de> for InvokeData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Context::deserialize(deserializer).map(InvokeData::Value)
    }
}

/// What the parent does when a child completes or fails.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum InvokeReaction {
    /// Send an event of this type to the parent.
    Event(String),
    /// Take this transition in the parent.
    Transition(TransitionConfig),
}

impl From<&str> for InvokeReaction {
    fn from(event: &str) -> Self {
        Self::Event(event.to_string())
    }
}

impl From<TransitionConfig> for InvokeReaction {
    fn from(transition: TransitionConfig) -> Self {
        Self::Transition(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_form_parses_reactions() {
        let invoke: InvokeConfig = serde_json::from_value(json!({
            "id": "video",
            "src": "videoChild",
            "onDone": "NEXT",
            "onError": {"target": "failed", "actions": "report"}
        }))
        .unwrap();

        assert!(matches!(&invoke.src, InvokeSource::Service(s) if s == "videoChild"));
        assert!(matches!(&invoke.on_done, Some(InvokeReaction::Event(e)) if e == "NEXT"));
        match &invoke.on_error {
            Some(InvokeReaction::Transition(t)) => {
                assert_eq!(t.target.as_deref(), Some("failed"));
                assert_eq!(t.actions.len(), 1);
            }
            other => panic!("unexpected reaction: {other:?}"),
        }
    }

    #[test]
    fn data_resolves_literal_or_derived() {
        let mut parent = Context::new();
        parent.insert("slot".into(), json!(4));
        let init = Event::init();

        let literal: InvokeData = serde_json::from_value(json!({"id": "v1"})).unwrap();
        assert_eq!(literal.resolve(&parent, &init)["id"], json!("v1"));

        let derived = InvokeData::Derive(Rc::new(|ctx: &Context, _: &Event| {
            let mut child = Context::new();
            child.insert("slot".into(), ctx["slot"].clone());
            child
        }));
        assert_eq!(derived.resolve(&parent, &init)["slot"], json!(4));
    }
}
