//! Flat transition resolution.
//!
//! `(value, context, event) -> snapshot` for a single table of states. Pure:
//! actions are collected, never executed.

use super::error::MachineError;
use super::node::{apply_steps, CompiledTransition, StateNode, StateTable, Step};
use crate::core::{Context, Event, Snapshot, StateValue};
use std::rc::Rc;

/// Actions of one selected transition, in execution order, and the state it
/// enters.
pub(crate) struct Plan<'a> {
    pub steps: Vec<Step<'a>>,
    pub target: Option<&'a StateNode>,
}

impl StateTable {
    pub fn node(&self, key: &str) -> Result<&StateNode, MachineError> {
        self.states
            .get(key)
            .ok_or_else(|| MachineError::UnknownState {
                machine: self.owner.clone(),
                state: key.to_string(),
            })
    }

    /// First candidate for the event whose guard passes.
    ///
    /// Guards see the source state's metadata.
    pub fn select<'a>(
        &self,
        source: &'a StateNode,
        context: &Context,
        event: &Event,
    ) -> Option<&'a CompiledTransition> {
        source
            .on
            .get(&event.kind)?
            .iter()
            .find(|candidate| candidate.allows(context, event, source.meta.as_ref()))
    }

    /// Exit actions and transition actions carry the source's metadata,
    /// entry actions the target's.
    pub fn plan<'a>(
        &'a self,
        source: &'a StateNode,
        transition: &'a CompiledTransition,
    ) -> Result<Plan<'a>, MachineError> {
        let source_meta = source.meta.as_ref();
        let Some(target_key) = &transition.target else {
            return Ok(Plan {
                steps: Step::all(&transition.actions, source_meta).collect(),
                target: None,
            });
        };

        let target = self.node(target_key)?;
        let steps = Step::all(&source.exit, source_meta)
            .chain(Step::all(&transition.actions, source_meta))
            .chain(Step::all(&target.entry, target.meta.as_ref()))
            .collect();
        Ok(Plan {
            steps,
            target: Some(target),
        })
    }

    /// Take an already selected transition.
    pub fn take(
        &self,
        source: &StateNode,
        transition: &CompiledTransition,
        context: &Rc<Context>,
        event: &Event,
    ) -> Result<Snapshot, MachineError> {
        let plan = self.plan(source, transition)?;
        let (actions, context, assigned) = apply_steps(&plan.steps, context, event);

        Ok(match plan.target {
            Some(target) => Snapshot {
                value: StateValue::Leaf(target.key.clone()),
                context,
                meta: target.meta.clone(),
                actions,
                changed: true,
            },
            None => Snapshot {
                value: StateValue::Leaf(source.key.clone()),
                context,
                meta: source.meta.clone(),
                actions,
                changed: assigned,
            },
        })
    }

    pub fn resolve(
        &self,
        from: &str,
        context: &Rc<Context>,
        event: &Event,
    ) -> Result<Snapshot, MachineError> {
        let source = self.node(from)?;
        match self.select(source, context, event) {
            Some(transition) => self.take(source, transition, context, event),
            None => Ok(Snapshot::unchanged(
                StateValue::Leaf(from.to_string()),
                context,
                source.meta.as_ref(),
            )),
        }
    }

    /// Entry actions of the initial state.
    pub fn initial_steps(&self) -> Result<(&StateNode, Vec<Step<'_>>), MachineError> {
        let node = self.node(&self.initial)?;
        Ok((node, Step::all(&node.entry, node.meta.as_ref()).collect()))
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::{Implementations, MachineBuilder, StateBuilder, TransitionBuilder};
    use crate::core::{Context, Event, Properties, StateValue};
    use crate::machine::{Machine, MachineError};
    use serde_json::json;
    use std::rc::Rc;

    fn counter() -> Properties {
        Properties::new().compute("count", |ctx, _, _| {
            json!(ctx["count"].as_i64().unwrap_or(0) + 1)
        })
    }

    fn machine() -> Machine {
        MachineBuilder::new("m")
            .initial("A")
            .with("count", 0)
            .meta(json!({"machine": true}))
            .state(
                "A",
                StateBuilder::new()
                    .meta(json!({"name": "A"}))
                    .exit("leaveA")
                    .on(
                        "NEXT",
                        TransitionBuilder::new().to("B").action("bump").action("onNext"),
                    )
                    .on("POKE", TransitionBuilder::new().action("bump"))
                    .on("LOG", TransitionBuilder::new().action("onNext"))
                    .on("GUARDED", TransitionBuilder::new().to("B").guard_named("never"))
                    .on("GUARDED", TransitionBuilder::new().to("C")),
            )
            .state(
                "B",
                StateBuilder::new()
                    .meta(json!({"name": "B"}))
                    .entry("bump")
                    .entry("enterB"),
            )
            .state("C", StateBuilder::new())
            .implementations(
                Implementations::new()
                    .assign_properties("bump", counter())
                    .action("leaveA", |_, _, _| {})
                    .action("onNext", |_, _, _| {})
                    .action("enterB", |_, _, _| {})
                    .guard("never", |_, _, _| false),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn unknown_event_leaves_snapshot_unchanged() {
        let machine = machine();
        let context = Rc::new(Context::new());

        let next = machine
            .transition(&"A".into(), &context, &Event::new("OTHER"))
            .unwrap();

        assert_eq!(next.value, StateValue::from("A"));
        assert!(!next.changed);
        assert!(Rc::ptr_eq(&next.context, &context));
        assert_eq!(next.meta, Some(json!({"name": "A"})));
    }

    #[test]
    fn targeted_transition_orders_exit_transition_entry() {
        let machine = machine();
        let start = machine.initial_state().clone();

        let next = machine.next(&start, &Event::new("NEXT")).unwrap();

        assert_eq!(next.value, StateValue::from("B"));
        assert!(next.changed);
        assert_eq!(next.context["count"], json!(2));
        assert_eq!(next.action_names(), vec!["leaveA", "onNext", "enterB"]);
        assert_eq!(next.meta, Some(json!({"name": "B"})));
    }

    #[test]
    fn phases_carry_their_own_meta() {
        let machine = machine();
        let next = machine
            .next(machine.initial_state(), &Event::new("NEXT"))
            .unwrap();

        let metas: Vec<_> = next.actions.iter().map(|a| a.meta().cloned()).collect();
        assert_eq!(
            metas,
            vec![
                Some(json!({"name": "A"})),
                Some(json!({"name": "A"})),
                Some(json!({"name": "B"}))
            ]
        );
    }

    #[test]
    fn targetless_assign_reports_change() {
        let machine = machine();
        let next = machine
            .next(machine.initial_state(), &Event::new("POKE"))
            .unwrap();

        assert_eq!(next.value, StateValue::from("A"));
        assert!(next.changed);
        assert_eq!(next.context["count"], json!(1));
        assert!(next.actions.is_empty());
    }

    #[test]
    fn targetless_side_effect_is_not_a_change() {
        let machine = machine();
        let start = machine.initial_state().clone();
        let next = machine.next(&start, &Event::new("LOG")).unwrap();

        assert!(!next.changed);
        assert!(Rc::ptr_eq(&next.context, &start.context));
        assert_eq!(next.action_names(), vec!["onNext"]);
    }

    #[test]
    fn first_passing_guard_wins() {
        let machine = machine();
        let next = machine
            .next(machine.initial_state(), &Event::new("GUARDED"))
            .unwrap();

        assert_eq!(next.value, StateValue::from("C"));
    }

    #[test]
    fn unknown_current_state_is_fatal() {
        let machine = machine();
        let result = machine.transition_from("Z", &Event::new("NEXT"));

        assert_eq!(
            result.unwrap_err(),
            MachineError::UnknownState {
                machine: "m".into(),
                state: "Z".into()
            }
        );
    }
}
