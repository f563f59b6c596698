//! Transition descriptors.

use super::machine::OneOrMany;
use crate::core::{Action, GuardRef};
use serde::Deserialize;

/// A candidate transition: optional target, actions and guard.
///
/// On the wire a bare string is shorthand for `{"target": <string>}`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(from = "TransitionRepr")]
pub struct TransitionConfig {
    /// `None` for targetless transitions.
    pub target: Option<String>,
    pub actions: Vec<Action>,
    pub cond: Option<GuardRef>,
}

impl TransitionConfig {
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::default()
        }
    }

    pub fn targetless() -> Self {
        Self::default()
    }
}

impl From<&str> for TransitionConfig {
    fn from(target: &str) -> Self {
        Self::to(target)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TransitionRepr {
    Target(String),
    Full {
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        actions: OneOrMany<Action>,
        #[serde(default)]
        cond: Option<GuardRef>,
    },
}

impl From<TransitionRepr> for TransitionConfig {
    fn from(repr: TransitionRepr) -> Self {
        match repr {
            TransitionRepr::Target(target) => Self::to(target),
            TransitionRepr::Full {
                target,
                actions,
                cond,
            } => Self {
                target,
                actions: actions.into_vec(),
                cond,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_string_is_a_target() {
        let transition: TransitionConfig = serde_json::from_value(json!("B")).unwrap();
        assert_eq!(transition.target.as_deref(), Some("B"));
        assert!(transition.actions.is_empty());
        assert!(transition.cond.is_none());
    }

    #[test]
    fn object_form_accepts_single_action() {
        let transition: TransitionConfig =
            serde_json::from_value(json!({"target": "C", "actions": "log", "cond": "ok"})).unwrap();
        assert_eq!(transition.target.as_deref(), Some("C"));
        assert_eq!(transition.actions.len(), 1);
        assert!(transition.cond.is_some());
    }

    #[test]
    fn empty_object_is_targetless() {
        let transition: TransitionConfig = serde_json::from_value(json!({})).unwrap();
        assert!(transition.target.is_none());
    }

    #[test]
    fn list_of_bare_targets_stays_a_list() {
        let list: OneOrMany<TransitionConfig> = serde_json::from_value(json!(["B", "C"])).unwrap();
        let targets: Vec<_> = list.iter().map(|t| t.target.as_deref()).collect();
        assert_eq!(targets, vec![Some("B"), Some("C")]);
    }
}
