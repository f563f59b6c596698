//! Machine and state node descriptors.

use super::invoke::InvokeConfig;
use super::transition::TransitionConfig;
use crate::core::{Action, Context, Meta};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a machine or state node (`type` on the wire).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Atomic,
    /// Children are independent regions.
    Parallel,
    /// Reaching this state completes the machine.
    Final,
}

/// A single item or a list of items.
///
/// Lists are tried first: a struct-shaped item would otherwise accept a JSON
/// array as a positional struct.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::One(item) => std::slice::from_ref(item),
            Self::Many(items) => items,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn push(&mut self, item: T) {
        let items = match std::mem::take(self) {
            Self::One(first) => vec![first, item],
            Self::Many(mut items) => {
                items.push(item);
                items
            }
        };
        *self = Self::Many(items);
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(item: T) -> Self {
        Self::One(item)
    }
}

/// Serializable machine description.
///
/// # Example
///
/// ```rust
/// use statecraft::config::{MachineConfig, NodeKind};
///
/// let config = MachineConfig::from_json(r#"{
///     "id": "light",
///     "initial": "green",
///     "context": {"cycles": 0},
///     "states": {
///         "green": {"on": {"TIMER": "yellow"}},
///         "yellow": {"after": {"500": "red"}},
///         "red": {"on": {"TIMER": {"target": "green", "actions": "countCycle"}}}
///     }
/// }"#).unwrap();
///
/// assert_eq!(config.id.as_deref(), Some("light"));
/// assert_eq!(config.kind, NodeKind::Atomic);
/// assert_eq!(config.states.keys().collect::<Vec<_>>(), ["green", "yellow", "red"]);
/// ```
#[derive(Clone, Default, Deserialize)]
pub struct MachineConfig {
    #[serde(default)]
    pub id: Option<String>,
    /// Absent only for parallel machines.
    #[serde(default)]
    pub initial: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub context: Context,
    #[serde(default)]
    pub meta: Option<Meta>,
    /// States of a flat machine, or regions of a parallel one.
    #[serde(default)]
    pub states: IndexMap<String, StateNodeConfig>,
}

impl MachineConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Overlay `context` on the default context.
    ///
    /// Used to stamp out child machines from a shared template.
    pub fn with_context(mut self, context: &Context) -> Self {
        self.context
            .extend(context.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.kind == NodeKind::Parallel
    }
}

impl fmt::Debug for MachineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineConfig")
            .field("id", &self.id)
            .field("initial", &self.initial)
            .field("kind", &self.kind)
            .field("states", &self.states.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A state node, or a region when it sits directly under a parallel machine.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StateNodeConfig {
    #[serde(default, rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub on: IndexMap<String, OneOrMany<TransitionConfig>>,
    #[serde(default)]
    pub entry: OneOrMany<Action>,
    #[serde(default)]
    pub exit: OneOrMany<Action>,
    /// Delay key (millisecond literal or delay name) to transition.
    #[serde(default)]
    pub after: IndexMap<String, OneOrMany<TransitionConfig>>,
    #[serde(default)]
    pub invoke: OneOrMany<InvokeConfig>,
    #[serde(default)]
    pub meta: Option<Meta>,
    /// Initial sub-state of a region.
    #[serde(default)]
    pub initial: Option<String>,
    /// Sub-states of a region.
    #[serde(default)]
    pub states: IndexMap<String, StateNodeConfig>,
}

impl StateNodeConfig {
    pub fn is_final(&self) -> bool {
        self.kind == NodeKind::Final
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GuardRef;
    use serde_json::json;

    #[test]
    fn shorthand_and_list_transitions() {
        let config = MachineConfig::from_value(json!({
            "initial": "A",
            "states": {
                "A": {
                    "on": {
                        "NEXT": "B",
                        "MAYBE": [
                            {"target": "B", "cond": "ready"},
                            {"actions": ["log", "count"]}
                        ]
                    }
                },
                "B": {"type": "final"}
            }
        }))
        .unwrap();

        let a = &config.states["A"];
        let next = a.on["NEXT"].as_slice();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].target.as_deref(), Some("B"));

        let maybe = a.on["MAYBE"].as_slice();
        assert!(matches!(&maybe[0].cond, Some(GuardRef::Named(n)) if n == "ready"));
        assert!(maybe[1].target.is_none());
        assert_eq!(maybe[1].actions.len(), 2);
        assert!(config.states["B"].is_final());
    }

    #[test]
    fn single_entry_action_and_invoke() {
        let config = MachineConfig::from_value(json!({
            "initial": "video",
            "states": {
                "video": {
                    "entry": "mount",
                    "invoke": {"id": "video", "src": "videoChild", "data": {"id": "v1"}, "onDone": "NEXT"}
                }
            }
        }))
        .unwrap();

        let video = &config.states["video"];
        assert_eq!(video.entry.as_slice().len(), 1);
        assert_eq!(video.invoke.as_slice()[0].id, "video");
    }

    #[test]
    fn parallel_regions_parse() {
        let config = MachineConfig::from_value(json!({
            "type": "parallel",
            "states": {
                "ui": {"initial": "x", "states": {"x": {}, "y": {}}},
                "data": {"initial": "p", "states": {"p": {}, "q": {}}}
            }
        }))
        .unwrap();

        assert!(config.is_parallel());
        assert_eq!(config.states["data"].initial.as_deref(), Some("p"));
    }

    #[test]
    fn with_context_overlays_template_defaults() {
        let template = MachineConfig::from_value(json!({
            "initial": "idle",
            "context": {"id": "template", "volume": 1},
            "states": {"idle": {}}
        }))
        .unwrap();

        let mut overrides = Context::new();
        overrides.insert("id".into(), json!("ad-7"));
        let config = template.with_context(&overrides);

        assert_eq!(config.context["id"], json!("ad-7"));
        assert_eq!(config.context["volume"], json!(1));
    }

    #[test]
    fn push_grows_single_item() {
        let mut actions: OneOrMany<Action> = Action::named("a").into();
        actions.push(Action::named("b"));
        assert_eq!(actions.as_slice().len(), 2);
    }
}
