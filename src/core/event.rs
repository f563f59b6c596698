//! Events delivered to machines.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Type of the synthetic event used for initial entry actions.
pub const INIT_EVENT: &str = "statecraft.init";

/// A tagged record: a `type` plus arbitrary payload fields.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Event;
///
/// let event = Event::new("SELECT").with("item", 3);
/// assert_eq!(event.kind, "SELECT");
/// assert_eq!(event.get("item"), Some(&serde_json::json!(3)));
///
/// let json = serde_json::to_string(&event).unwrap();
/// assert_eq!(json, r#"{"type":"SELECT","item":3}"#);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Map::new(),
        }
    }

    /// Add a payload field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn init() -> Self {
        Self::new(INIT_EVENT)
    }

    /// Event passed to guards, delays and actions of a delayed transition.
    pub fn after(delay: &str) -> Self {
        Self::new(format!("statecraft.after.{delay}"))
    }

    /// Event passed to an `onDone` reaction.
    pub fn done_invoke(id: &str) -> Self {
        Self::new(format!("done.invoke.{id}"))
    }

    /// Event passed to an `onError` reaction.
    pub fn invoke_error(id: &str, message: impl Into<String>) -> Self {
        Self::new(format!("error.invoke.{id}")).with("message", message.into())
    }
}

impl From<&str> for Event {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}

impl From<String> for Event {
    fn from(kind: String) -> Self {
        Self::new(kind)
    }
}
