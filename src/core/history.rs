//! Transition history tracking.
//!
//! Interpreters record every change of value. The history is immutable:
//! [`TransitionHistory::record`] returns a new history.

use super::value::StateValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single change of value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: StateValue,
    pub to: StateValue,
    /// Type of the event that caused the change.
    pub event: String,
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    pub fn now(from: StateValue, to: StateValue, event: impl Into<String>) -> Self {
        Self {
            from,
            to,
            event: event.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered history of value changes.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{StateValue, TransitionHistory, TransitionRecord};
///
/// let history = TransitionHistory::new()
///     .record(TransitionRecord::now("idle".into(), "loading".into(), "FETCH"))
///     .record(TransitionRecord::now("loading".into(), "ready".into(), "DONE"));
///
/// let path = history.get_path();
/// assert_eq!(path.len(), 3);
/// assert_eq!(path[2], &StateValue::from("ready"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionHistory {
    transitions: Vec<TransitionRecord>,
}

impl TransitionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transition, returning a new history.
    pub fn record(&self, transition: TransitionRecord) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        Self { transitions }
    }

    /// Values traversed: the first `from`, then every `to`.
    pub fn get_path(&self) -> Vec<&StateValue> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Time between the first and last recorded transition.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(from: &str, to: &str) -> TransitionRecord {
        TransitionRecord::now(from.into(), to.into(), "NEXT")
    }

    #[test]
    fn new_history_is_empty() {
        let history = TransitionHistory::new();
        assert!(history.is_empty());
        assert!(history.get_path().is_empty());
        assert!(history.duration().is_none());
    }

    #[test]
    fn record_is_immutable() {
        let history = TransitionHistory::new();
        let new_history = history.record(record("A", "B"));

        assert_eq!(history.len(), 0);
        assert_eq!(new_history.len(), 1);
    }

    #[test]
    fn get_path_returns_value_sequence() {
        let history = TransitionHistory::new()
            .record(record("A", "B"))
            .record(record("B", "C"));

        let path = history.get_path();
        assert_eq!(
            path,
            vec![
                &StateValue::from("A"),
                &StateValue::from("B"),
                &StateValue::from("C")
            ]
        );
    }

    #[test]
    fn duration_spans_first_to_last() {
        let start = Utc::now();
        let mut first = record("A", "B");
        first.timestamp = start;
        let mut second = record("B", "C");
        second.timestamp = start + chrono::Duration::milliseconds(250);

        let history = TransitionHistory::new().record(first).record(second);

        assert_eq!(history.duration(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn single_transition_has_duration_zero() {
        let history = TransitionHistory::new().record(record("A", "B"));
        assert_eq!(history.duration(), Some(Duration::ZERO));
    }

    #[test]
    fn history_serializes_parallel_values() {
        let history = TransitionHistory::new().record(TransitionRecord::now(
            StateValue::regions([("ui", "x"), ("data", "p")]),
            StateValue::regions([("ui", "y"), ("data", "p")]),
            "TOGGLE",
        ));

        let json = serde_json::to_string(&history).unwrap();
        let restored: TransitionHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, history);
    }
}
