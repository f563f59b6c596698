//! Parallel transition resolution.
//!
//! Each region selects a transition on its own, in region declaration order.
//! The actions of every region that selected one are concatenated and applied
//! once to the shared context.

use super::error::MachineError;
use super::node::{apply_steps, StateTable, Step};
use crate::core::{Context, Event, Meta, Snapshot, StateValue};
use indexmap::IndexMap;
use std::rc::Rc;

pub(crate) fn resolve(
    machine: &str,
    regions: &[StateTable],
    meta: Option<&Meta>,
    value: &StateValue,
    context: &Rc<Context>,
    event: &Event,
) -> Result<Snapshot, MachineError> {
    let current = region_values(machine, regions, value)?;

    let mut steps: Vec<Step<'_>> = Vec::new();
    let mut next = IndexMap::with_capacity(regions.len());
    let mut selected = false;
    let mut changed = false;

    for (region, active) in regions.iter().zip(current) {
        let source = region.node(active)?;
        let mut sub_value = active;

        if let Some(transition) = region.select(source, context, event) {
            let plan = region.plan(source, transition)?;
            if let Some(target) = plan.target {
                changed |= target.key != source.key;
                sub_value = target.key.as_str();
            }
            steps.extend(plan.steps);
            selected = true;
        }
        next.insert(region.region_key().to_string(), StateValue::from(sub_value));
    }

    if !selected {
        return Ok(Snapshot::unchanged(value.clone(), context, meta));
    }

    let (actions, context, _) = apply_steps(&steps, context, event);
    Ok(Snapshot {
        value: StateValue::Regions(next),
        context,
        meta: meta.cloned(),
        actions,
        changed,
    })
}

/// Initial value and the entry actions of every region's initial state.
pub(crate) fn initial<'a>(
    regions: &'a [StateTable],
) -> Result<(StateValue, Vec<Step<'a>>), MachineError> {
    let mut value = IndexMap::with_capacity(regions.len());
    let mut steps = Vec::new();
    for region in regions {
        let (node, entry) = region.initial_steps()?;
        value.insert(region.region_key().to_string(), StateValue::from(node.key.as_str()));
        steps.extend(entry);
    }
    Ok((StateValue::Regions(value), steps))
}

/// Active sub-state of each region, in region order.
pub(crate) fn region_values<'v>(
    machine: &str,
    regions: &[StateTable],
    value: &'v StateValue,
) -> Result<Vec<&'v str>, MachineError> {
    let StateValue::Regions(current) = value else {
        return Err(MachineError::UnexpectedValue {
            machine: machine.to_string(),
            value: value.to_string(),
        });
    };
    if current.len() != regions.len() {
        return Err(MachineError::UnexpectedValue {
            machine: machine.to_string(),
            value: value.to_string(),
        });
    }

    regions
        .iter()
        .map(|region| {
            let name = region.region_key();
            current
                .get(name)
                .and_then(StateValue::as_leaf)
                .ok_or_else(|| MachineError::MissingRegion {
                    machine: machine.to_string(),
                    region: name.to_string(),
                })
        })
        .collect()
}

impl StateTable {
    /// Region key of a region table; the owner for a flat table.
    pub(crate) fn region_key(&self) -> &str {
        self.region.as_deref().unwrap_or(&self.owner)
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::{Implementations, MachineBuilder, StateBuilder, TransitionBuilder};
    use crate::core::{Event, Properties, StateValue};
    use crate::machine::{Machine, MachineError};
    use serde_json::json;
    use std::rc::Rc;

    fn machine() -> Machine {
        MachineBuilder::new("player")
            .parallel()
            .with("log", json!([]))
            .meta(json!({"kind": "player"}))
            .state(
                "ui",
                StateBuilder::new()
                    .initial("x")
                    .state(
                        "x",
                        StateBuilder::new()
                            .entry("markUi")
                            .on("TOGGLE", "y")
                            .on("SHARED", TransitionBuilder::new().to("y").action("markUi")),
                    )
                    .state("y", StateBuilder::new().on("TOGGLE", "x")),
            )
            .state(
                "data",
                StateBuilder::new()
                    .initial("p")
                    .state(
                        "p",
                        StateBuilder::new()
                            .entry("markData")
                            .on("LOAD", "q")
                            .on("SHARED", TransitionBuilder::new().action("markData"))
                            .on("TOUCH", TransitionBuilder::new().action("markData")),
                    )
                    .state("q", StateBuilder::new()),
            )
            .implementations(
                Implementations::new()
                    .assign_properties("markUi", append("ui"))
                    .assign_properties("markData", append("data")),
            )
            .build()
            .unwrap()
    }

    fn append(tag: &'static str) -> Properties {
        Properties::new().compute("log", move |ctx, _, _| {
            let mut log = ctx["log"].as_array().cloned().unwrap_or_default();
            log.push(json!(tag));
            json!(log)
        })
    }

    #[test]
    fn initial_value_has_one_entry_per_region() {
        let machine = machine();
        let initial = machine.initial_state();

        assert_eq!(initial.value, StateValue::regions([("ui", "x"), ("data", "p")]));
        assert_eq!(initial.context["log"], json!(["ui", "data"]));
        assert_eq!(initial.meta, Some(json!({"kind": "player"})));
    }

    #[test]
    fn event_for_one_region_leaves_the_other() {
        let machine = machine();
        let next = machine
            .next(machine.initial_state(), &Event::new("TOGGLE"))
            .unwrap();

        assert!(next.changed);
        assert_eq!(next.value.region("ui"), Some(&StateValue::from("y")));
        assert_eq!(next.value.region("data"), Some(&StateValue::from("p")));
        let StateValue::Regions(regions) = &next.value else {
            panic!("expected regions");
        };
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn region_actions_apply_once_in_region_order() {
        let machine = machine();
        let next = machine
            .next(machine.initial_state(), &Event::new("SHARED"))
            .unwrap();

        assert_eq!(
            next.context["log"],
            json!(["ui", "data", "ui", "data"])
        );
        assert!(next.matches("ui.y"));
        assert!(next.matches("data.p"));
    }

    #[test]
    fn targetless_region_updates_context_without_change() {
        let machine = machine();
        let start = machine.initial_state().clone();
        let next = machine.next(&start, &Event::new("TOUCH")).unwrap();

        assert!(!next.changed);
        assert_eq!(next.value, start.value);
        assert_eq!(next.context["log"], json!(["ui", "data", "data"]));
    }

    #[test]
    fn unmatched_event_shares_context() {
        let machine = machine();
        let start = machine.initial_state().clone();
        let next = machine.next(&start, &Event::new("NOPE")).unwrap();

        assert!(!next.changed);
        assert!(Rc::ptr_eq(&next.context, &start.context));
    }

    #[test]
    fn missing_region_is_fatal() {
        let machine = machine();
        let value = StateValue::regions([("ui", "x"), ("other", "p")]);
        let result = machine.transition(&value, machine.default_context(), &Event::new("TOGGLE"));

        assert_eq!(
            result.unwrap_err(),
            MachineError::MissingRegion {
                machine: "player".into(),
                region: "data".into()
            }
        );
    }

    #[test]
    fn flat_value_is_rejected() {
        let machine = machine();
        let result = machine.transition_from("x", &Event::new("TOGGLE"));
        assert!(matches!(result, Err(MachineError::UnexpectedValue { .. })));
    }

    #[test]
    fn dotted_region_keys_are_kept_verbatim() {
        let machine = MachineBuilder::new("player")
            .parallel()
            .state(
                "ui.main",
                StateBuilder::new()
                    .initial("x")
                    .state("x", StateBuilder::new().on("TOGGLE", "y"))
                    .state("y", StateBuilder::new()),
            )
            .build()
            .unwrap();

        assert_eq!(machine.initial_state().value, StateValue::regions([("ui.main", "x")]));
        let next = machine.next(machine.initial_state(), &Event::new("TOGGLE")).unwrap();
        assert_eq!(next.value, StateValue::regions([("ui.main", "y")]));
    }
}
