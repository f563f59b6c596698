//! State values, context and metadata.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The machine's data payload.
pub type Context = Map<String, Value>;

/// Free-form metadata attached to a machine or a state node.
pub type Meta = Value;

/// The control value of a machine.
///
/// Flat machines are always in a single [`Leaf`](Self::Leaf) state. Parallel
/// machines hold one entry per region, in region declaration order.
///
/// # Example
///
/// ```rust
/// use statecraft::core::StateValue;
///
/// let flat = StateValue::from("idle");
/// assert!(flat.matches("idle"));
///
/// let parallel = StateValue::regions([("ui", "visible"), ("data", "loading")]);
/// assert!(parallel.matches("ui.visible"));
/// assert!(!parallel.matches("data.ready"));
/// assert_eq!(parallel.to_string(), "{ui: visible, data: loading}");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Leaf(String),
    Regions(IndexMap<String, StateValue>),
}

impl StateValue {
    /// Build a parallel value from `(region, state)` pairs.
    pub fn regions<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<StateValue>,
    {
        Self::Regions(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Self::Leaf(key) => Some(key),
            Self::Regions(_) => None,
        }
    }

    /// Sub-value of a region, if this is a parallel value.
    pub fn region(&self, key: &str) -> Option<&StateValue> {
        match self {
            Self::Leaf(_) => None,
            Self::Regions(regions) => regions.get(key),
        }
    }

    /// Whether the value is `key`, or for parallel values whether the dotted
    /// path `region.state` is active.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Leaf(current) => current == key,
            Self::Regions(regions) => match key.split_once('.') {
                Some((region, rest)) => regions.get(region).is_some_and(|v| v.matches(rest)),
                None => false,
            },
        }
    }
}

impl From<&str> for StateValue {
    fn from(key: &str) -> Self {
        Self::Leaf(key.to_string())
    }
}

impl From<String> for StateValue {
    fn from(key: String) -> Self {
        Self::Leaf(key)
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(key) => f.write_str(key),
            Self::Regions(regions) => {
                f.write_str("{")?;
                for (i, (region, value)) in regions.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{region}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaf_matches_only_its_key() {
        let value = StateValue::from("A");
        assert!(value.matches("A"));
        assert!(!value.matches("B"));
        assert!(!value.matches("A.B"));
    }

    #[test]
    fn region_paths_match_active_sub_states() {
        let value = StateValue::regions([("ui", "x"), ("data", "p")]);
        assert!(value.matches("ui.x"));
        assert!(value.matches("data.p"));
        assert!(!value.matches("ui"));
        assert!(!value.matches("missing.x"));
    }

    #[test]
    fn deserializes_leaf_and_regions() {
        let leaf: StateValue = serde_json::from_value(json!("idle")).unwrap();
        assert_eq!(leaf, StateValue::from("idle"));

        let regions: StateValue = serde_json::from_value(json!({"ui": "x", "data": "q"})).unwrap();
        assert_eq!(regions.region("data"), Some(&StateValue::from("q")));
    }

    #[test]
    fn regions_keep_declaration_order() {
        let value = StateValue::regions([("zeta", "a"), ("alpha", "b")]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"zeta":"a","alpha":"b"}"#);
    }
}
