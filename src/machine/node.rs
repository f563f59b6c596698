//! Compiled state nodes.
//!
//! Descriptors are lowered into these types once, with every name resolved,
//! so resolving a transition never consults the implementation bundle.

use crate::builder::DelayFn;
use crate::config::{InvokeData, InvokeSource, NodeKind};
use crate::core::{ActionFn, Assigner, BoundAction, Context, Event, Guard, Meta};
use indexmap::IndexMap;
use std::rc::Rc;
use std::time::Duration;

#[derive(Clone)]
pub(crate) enum ResolvedAction {
    Exec { name: String, exec: ActionFn },
    Assign(Assigner),
}

pub(crate) struct CompiledTransition {
    pub target: Option<String>,
    pub actions: Vec<ResolvedAction>,
    pub guard: Option<Guard>,
}

impl CompiledTransition {
    pub fn allows(&self, context: &Context, event: &Event, meta: Option<&Meta>) -> bool {
        self.guard
            .as_ref()
            .map_or(true, |guard| guard.check(context, event, meta))
    }
}

pub(crate) enum Delay {
    Fixed(Duration),
    Named(DelayFn),
}

impl Delay {
    pub fn resolve(&self, context: &Context, event: &Event, meta: Option<&Meta>) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Named(resolve) => Duration::from_millis(resolve(context, event, meta)),
        }
    }
}

pub(crate) struct AfterTransition {
    pub key: String,
    pub delay: Delay,
    pub candidates: Vec<CompiledTransition>,
}

pub(crate) enum Reaction {
    Event(String),
    Transition(CompiledTransition),
}

pub(crate) struct CompiledInvoke {
    pub id: String,
    pub src: InvokeSource,
    pub data: Option<InvokeData>,
    pub on_done: Option<Reaction>,
    pub on_error: Option<Reaction>,
}

pub(crate) struct StateNode {
    pub key: String,
    pub kind: NodeKind,
    pub on: IndexMap<String, Vec<CompiledTransition>>,
    pub entry: Vec<ResolvedAction>,
    pub exit: Vec<ResolvedAction>,
    pub after: Vec<AfterTransition>,
    pub invoke: Vec<CompiledInvoke>,
    pub meta: Option<Meta>,
}

impl StateNode {
    pub fn is_final(&self) -> bool {
        self.kind == NodeKind::Final
    }

    pub fn after(&self, key: &str) -> Option<&AfterTransition> {
        self.after.iter().find(|after| after.key == key)
    }

    pub fn invoke(&self, id: &str) -> Option<&CompiledInvoke> {
        self.invoke.iter().find(|invoke| invoke.id == id)
    }
}

/// States of a flat machine, or of one region of a parallel machine.
pub(crate) struct StateTable {
    /// Machine id, or `machine.region` for regions.
    pub owner: String,
    /// Key of the region this table belongs to, as written in the descriptor.
    pub region: Option<String>,
    pub initial: String,
    pub states: IndexMap<String, StateNode>,
}

/// An action scheduled within a transition, with the metadata of the state
/// it belongs to.
pub(crate) struct Step<'a> {
    pub action: &'a ResolvedAction,
    pub meta: Option<&'a Meta>,
}

impl<'a> Step<'a> {
    pub fn all(actions: &'a [ResolvedAction], meta: Option<&'a Meta>) -> impl Iterator<Item = Step<'a>> {
        actions.iter().map(move |action| Step { action, meta })
    }
}

/// Thread `context` through every assign in order, collecting the rest.
///
/// Returns the non-assign actions, the final context (the same `Rc` when
/// nothing was assigned) and whether any assign ran.
pub(crate) fn apply_steps(
    steps: &[Step<'_>],
    context: &Rc<Context>,
    event: &Event,
) -> (Vec<BoundAction>, Rc<Context>, bool) {
    let mut current = Rc::clone(context);
    let mut actions = Vec::new();
    let mut assigned = false;

    for step in steps {
        match step.action {
            ResolvedAction::Assign(assigner) => {
                current = Rc::new(assigner.apply(&current, event, step.meta));
                assigned = true;
            }
            ResolvedAction::Exec { name, exec } => actions.push(BoundAction {
                name: name.clone(),
                exec: Rc::clone(exec),
                meta: step.meta.cloned(),
            }),
        }
    }

    (actions, current, assigned)
}
