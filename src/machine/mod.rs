//! Compiled machines and pure transition resolution.
//!
//! A [`Machine`] is immutable and cheap to clone. Resolving a transition never
//! executes actions; the [`Snapshot`] it returns lists them, and the
//! interpreter runs them when it commits the snapshot.

mod compile;
mod error;
mod node;
mod parallel;
mod resolve;

pub use error::MachineError;

pub(crate) use node::{CompiledInvoke, CompiledTransition, Reaction, StateNode, StateTable};

use crate::builder::{BuildError, DefinitionIssue, Implementations, ServiceRegistry};
use crate::config::MachineConfig;
use crate::core::{Context, Event, Meta, Snapshot, StateValue};
use compile::Topology;
use node::apply_steps;
use std::fmt;
use std::rc::Rc;

/// Name used in errors and logs for machines without an id.
const ANONYMOUS: &str = "(anonymous)";

/// A compiled statechart definition.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::{Implementations, MachineBuilder, StateBuilder, TransitionBuilder};
/// use statecraft::core::{Event, Properties};
///
/// let machine = MachineBuilder::new("counter")
///     .initial("idle")
///     .with("count", 0)
///     .state(
///         "idle",
///         StateBuilder::new().on("INC", TransitionBuilder::new().action("increment")),
///     )
///     .implementations(Implementations::new().assign_properties(
///         "increment",
///         Properties::new().compute("count", |ctx, _, _| {
///             (ctx["count"].as_i64().unwrap_or(0) + 1).into()
///         }),
///     ))
///     .build()
///     .unwrap();
///
/// let next = machine.next(machine.initial_state(), &Event::new("INC")).unwrap();
/// assert_eq!(next.context["count"], 1);
/// assert!(next.matches("idle"));
/// ```
#[derive(Clone)]
pub struct Machine {
    inner: Rc<MachineInner>,
}

struct MachineInner {
    id: Option<String>,
    meta: Option<Meta>,
    context: Rc<Context>,
    topology: Topology,
    initial: Snapshot,
    services: ServiceRegistry,
}

impl Machine {
    /// Validate `config` against `implementations` and compile it.
    pub fn compile(config: MachineConfig, implementations: Implementations) -> Result<Self, BuildError> {
        let name = config.id.as_deref().unwrap_or(ANONYMOUS).to_string();
        let topology = compile::lower(&name, &config, &implementations)?;
        let context = Rc::new(config.context);
        let meta = config.meta;

        let initial = initial_snapshot(&topology, meta.as_ref(), &context).map_err(|error| {
            BuildError::InvalidDefinition {
                machine: name.clone(),
                issues: vec![DefinitionIssue::UnknownInitial {
                    state: error.to_string(),
                }],
            }
        })?;

        Ok(Self {
            inner: Rc::new(MachineInner {
                id: config.id,
                meta,
                context,
                topology,
                initial,
                services: implementations.service_registry().clone(),
            }),
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.inner.id.as_deref()
    }

    pub(crate) fn name(&self) -> &str {
        self.id().unwrap_or(ANONYMOUS)
    }

    pub fn meta(&self) -> Option<&Meta> {
        self.inner.meta.as_ref()
    }

    pub fn default_context(&self) -> &Rc<Context> {
        &self.inner.context
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self.inner.topology, Topology::Parallel(_))
    }

    /// Snapshot after the initial entry actions' assigns, with the remaining
    /// entry actions still pending.
    pub fn initial_state(&self) -> &Snapshot {
        &self.inner.initial
    }

    /// Final states, as `region.state` for parallel machines.
    pub fn final_states(&self) -> Vec<String> {
        match &self.inner.topology {
            Topology::Flat(table) => final_keys(table).map(str::to_string).collect(),
            Topology::Parallel(regions) => regions
                .iter()
                .flat_map(|region| {
                    final_keys(region).map(move |key| format!("{}.{key}", region.region_key()))
                })
                .collect(),
        }
    }

    /// Whether `value` is complete: a final state, or every region in one.
    pub fn is_final(&self, value: &StateValue) -> bool {
        match &self.inner.topology {
            Topology::Flat(table) => value
                .as_leaf()
                .and_then(|key| table.states.get(key))
                .is_some_and(StateNode::is_final),
            Topology::Parallel(regions) => parallel::region_values(self.name(), regions, value)
                .map(|active| {
                    regions
                        .iter()
                        .zip(active)
                        .all(|(region, key)| region.states.get(key).is_some_and(StateNode::is_final))
                })
                .unwrap_or(false),
        }
    }

    /// Resolve `event` from `value` with `context`.
    ///
    /// When no transition is enabled the result has `changed == false` and
    /// shares `context`.
    pub fn transition(
        &self,
        value: &StateValue,
        context: &Rc<Context>,
        event: &Event,
    ) -> Result<Snapshot, MachineError> {
        match &self.inner.topology {
            Topology::Flat(table) => table.resolve(self.leaf(value)?, context, event),
            Topology::Parallel(regions) => parallel::resolve(
                self.name(),
                regions,
                self.meta(),
                value,
                context,
                event,
            ),
        }
    }

    /// Resolve `event` from a previous snapshot.
    pub fn next(&self, from: &Snapshot, event: &Event) -> Result<Snapshot, MachineError> {
        self.transition(&from.value, &from.context, event)
    }

    /// Resolve `event` from `state` with the default context.
    pub fn transition_from(&self, state: &str, event: &Event) -> Result<Snapshot, MachineError> {
        self.transition(&StateValue::from(state), self.default_context(), event)
    }

    /// A resting snapshot at `value`, without running any action.
    pub fn snapshot_at(&self, value: StateValue, context: Rc<Context>) -> Result<Snapshot, MachineError> {
        let meta = match &self.inner.topology {
            Topology::Flat(table) => table.node(self.leaf(&value)?)?.meta.clone(),
            Topology::Parallel(regions) => {
                let active = parallel::region_values(self.name(), regions, &value)?;
                for (region, key) in regions.iter().zip(active) {
                    region.node(key)?;
                }
                self.inner.meta.clone()
            }
        };

        Ok(Snapshot {
            value,
            context,
            meta,
            actions: Vec::new(),
            changed: false,
        })
    }

    /// Services registered with this machine.
    pub fn services(&self) -> &ServiceRegistry {
        &self.inner.services
    }

    /// State table of a flat machine.
    pub(crate) fn flat(&self) -> Option<&StateTable> {
        match &self.inner.topology {
            Topology::Flat(table) => Some(table),
            Topology::Parallel(_) => None,
        }
    }

    /// Take the first enabled candidate of the delayed transition `key` of
    /// `state`.
    pub(crate) fn fire_after(
        &self,
        state: &str,
        key: &str,
        context: &Rc<Context>,
        event: &Event,
    ) -> Result<Option<Snapshot>, MachineError> {
        let Some(table) = self.flat() else {
            return Ok(None);
        };
        let source = table.node(state)?;
        let Some(after) = source.after(key) else {
            return Ok(None);
        };
        after
            .candidates
            .iter()
            .find(|candidate| candidate.allows(context, event, source.meta.as_ref()))
            .map(|candidate| table.take(source, candidate, context, event))
            .transpose()
    }

    /// Take `transition` from `state` if its guard passes.
    pub(crate) fn react(
        &self,
        state: &str,
        transition: &CompiledTransition,
        context: &Rc<Context>,
        event: &Event,
    ) -> Result<Option<Snapshot>, MachineError> {
        let Some(table) = self.flat() else {
            return Ok(None);
        };
        let source = table.node(state)?;
        if !transition.allows(context, event, source.meta.as_ref()) {
            return Ok(None);
        }
        table.take(source, transition, context, event).map(Some)
    }

    fn leaf<'v>(&self, value: &'v StateValue) -> Result<&'v str, MachineError> {
        value.as_leaf().ok_or_else(|| MachineError::UnexpectedValue {
            machine: self.name().to_string(),
            value: value.to_string(),
        })
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("id", &self.inner.id)
            .field("parallel", &self.is_parallel())
            .field("initial", &self.inner.initial.value)
            .finish()
    }
}

fn final_keys(table: &StateTable) -> impl Iterator<Item = &str> {
    table
        .states
        .values()
        .filter(|node| node.is_final())
        .map(|node| node.key.as_str())
}

fn initial_snapshot(
    topology: &Topology,
    machine_meta: Option<&Meta>,
    context: &Rc<Context>,
) -> Result<Snapshot, MachineError> {
    let init = Event::init();
    let (value, steps, meta) = match topology {
        Topology::Flat(table) => {
            let (node, steps) = table.initial_steps()?;
            (StateValue::from(node.key.as_str()), steps, node.meta.clone())
        }
        Topology::Parallel(regions) => {
            let (value, steps) = parallel::initial(regions)?;
            (value, steps, machine_meta.cloned())
        }
    };

    let (actions, context, _) = apply_steps(&steps, context, &init);
    Ok(Snapshot {
        value,
        context,
        meta,
        actions,
        changed: false,
    })
}
