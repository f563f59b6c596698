//! Lowering of descriptors into compiled state tables.
//!
//! Every problem in a descriptor is collected with `Validation` so a single
//! build reports all of them.

use super::node::{
    AfterTransition, CompiledInvoke, CompiledTransition, Delay, Reaction, ResolvedAction, StateNode,
    StateTable,
};
use crate::builder::{ActionImpl, BuildError, DefinitionIssue, Implementations};
use crate::config::{InvokeConfig, InvokeReaction, MachineConfig, NodeKind, StateNodeConfig, TransitionConfig};
use crate::core::{Action, Guard, GuardRef};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

pub(crate) enum Topology {
    Flat(StateTable),
    Parallel(Vec<StateTable>),
}

type Check = Validation<(), NonEmptyVec<DefinitionIssue>>;

pub(crate) fn lower(
    name: &str,
    config: &MachineConfig,
    implementations: &Implementations,
) -> Result<Topology, BuildError> {
    let mut lowering = Lowering {
        implementations,
        checks: Vec::new(),
    };

    let topology = if config.is_parallel() {
        let regions = config
            .states
            .iter()
            .filter_map(|(key, region)| lowering.region(name, key, region))
            .collect();
        Topology::Parallel(regions)
    } else {
        let initial = config
            .initial
            .as_deref()
            .ok_or_else(|| BuildError::MissingInitialState {
                machine: name.to_string(),
            })?;
        Topology::Flat(lowering.table(name.to_string(), None, initial, &config.states))
    };

    lowering.finish(name)?;
    Ok(topology)
}

struct Lowering<'a> {
    implementations: &'a Implementations,
    checks: Vec<Check>,
}

impl Lowering<'_> {
    fn require(&mut self, ok: bool, issue: impl FnOnce() -> DefinitionIssue) -> bool {
        self.checks.push(if ok {
            Validation::success(())
        } else {
            Validation::fail(issue())
        });
        ok
    }

    fn finish(self, name: &str) -> Result<(), BuildError> {
        if self.checks.is_empty() {
            return Ok(());
        }
        match Validation::all_vec(self.checks).map(|_| ()) {
            Validation::Success(_) => Ok(()),
            Validation::Failure(errors) => Err(BuildError::InvalidDefinition {
                machine: name.to_string(),
                issues: errors.iter().cloned().collect(),
            }),
        }
    }

    fn region(&mut self, machine: &str, key: &str, region: &StateNodeConfig) -> Option<StateTable> {
        let handlers = region.on.is_empty()
            && region.entry.is_empty()
            && region.exit.is_empty()
            && region.after.is_empty()
            && region.invoke.is_empty();
        self.require(handlers, || DefinitionIssue::Unsupported {
            state: key.to_string(),
            feature: "handlers on a region",
        });

        let initial = region.initial.as_deref();
        self.require(initial.is_some(), || DefinitionIssue::MissingRegionInitial {
            region: key.to_string(),
        });
        Some(self.table(format!("{machine}.{key}"), Some(key), initial?, &region.states))
    }

    fn table(
        &mut self,
        owner: String,
        region: Option<&str>,
        initial: &str,
        configs: &IndexMap<String, StateNodeConfig>,
    ) -> StateTable {
        let in_region = region.is_some();
        self.require(configs.contains_key(initial), || DefinitionIssue::UnknownInitial {
            state: initial.to_string(),
        });

        let states = configs
            .iter()
            .map(|(key, node)| (key.clone(), self.node(key, node, configs, in_region)))
            .collect();

        StateTable {
            owner,
            region: region.map(str::to_string),
            initial: initial.to_string(),
            states,
        }
    }

    fn node(
        &mut self,
        key: &str,
        config: &StateNodeConfig,
        siblings: &IndexMap<String, StateNodeConfig>,
        in_region: bool,
    ) -> StateNode {
        self.require(config.states.is_empty(), || DefinitionIssue::Unsupported {
            state: key.to_string(),
            feature: "nested states",
        });
        self.require(config.kind != NodeKind::Parallel, || DefinitionIssue::Unsupported {
            state: key.to_string(),
            feature: "nested parallel states",
        });
        if in_region {
            self.require(config.after.is_empty(), || DefinitionIssue::Unsupported {
                state: key.to_string(),
                feature: "delayed transitions",
            });
            self.require(config.invoke.is_empty(), || DefinitionIssue::Unsupported {
                state: key.to_string(),
                feature: "invocations",
            });
        }

        let on = config
            .on
            .iter()
            .map(|(event, candidates)| {
                let compiled = candidates
                    .iter()
                    .map(|t| self.transition(key, event, t, siblings))
                    .collect();
                (event.clone(), compiled)
            })
            .collect();

        let after = config
            .after
            .iter()
            .filter_map(|(delay, candidates)| {
                let label = format!("after {delay}");
                let candidates = candidates
                    .iter()
                    .map(|t| self.transition(key, &label, t, siblings))
                    .collect();
                Some(AfterTransition {
                    key: delay.clone(),
                    delay: self.delay(key, delay)?,
                    candidates,
                })
            })
            .collect();

        let mut seen = HashSet::new();
        let invoke = config
            .invoke
            .iter()
            .filter_map(|invoke| {
                let unique = seen.insert(invoke.id.as_str());
                self.require(unique, || DefinitionIssue::DuplicateInvoke {
                    state: key.to_string(),
                    id: invoke.id.clone(),
                })
                .then(|| self.invoke(key, invoke, siblings))
            })
            .collect();

        StateNode {
            key: key.to_string(),
            kind: config.kind,
            on,
            entry: self.actions(key, config.entry.as_slice()),
            exit: self.actions(key, config.exit.as_slice()),
            after,
            invoke,
            meta: config.meta.clone(),
        }
    }

    fn transition(
        &mut self,
        state: &str,
        event: &str,
        config: &TransitionConfig,
        siblings: &IndexMap<String, StateNodeConfig>,
    ) -> CompiledTransition {
        if let Some(target) = &config.target {
            self.require(siblings.contains_key(target), || DefinitionIssue::UnknownTarget {
                state: state.to_string(),
                event: event.to_string(),
                target: target.clone(),
            });
        }

        CompiledTransition {
            target: config.target.clone(),
            actions: self.actions(state, &config.actions),
            guard: config.cond.as_ref().and_then(|cond| self.guard(state, cond)),
        }
    }

    fn actions(&mut self, state: &str, actions: &[Action]) -> Vec<ResolvedAction> {
        actions
            .iter()
            .filter_map(|action| self.action(state, action))
            .collect()
    }

    fn action(&mut self, state: &str, action: &Action) -> Option<ResolvedAction> {
        match action {
            Action::Inline { name, exec } => Some(ResolvedAction::Exec {
                name: name.clone(),
                exec: Rc::clone(exec),
            }),
            Action::Assign(assigner) => Some(ResolvedAction::Assign(assigner.clone())),
            Action::Named(name) => {
                let implementations = self.implementations;
                let found = implementations.find_action(name);
                self.require(found.is_some(), || DefinitionIssue::UnknownAction {
                    state: state.to_string(),
                    action: name.clone(),
                });
                found.map(|implementation| match implementation {
                    ActionImpl::Exec(exec) => ResolvedAction::Exec {
                        name: name.clone(),
                        exec: Rc::clone(exec),
                    },
                    ActionImpl::Assign(assigner) => ResolvedAction::Assign(assigner.clone()),
                })
            }
        }
    }

    fn guard(&mut self, state: &str, guard: &GuardRef) -> Option<Guard> {
        match guard {
            GuardRef::Inline(guard) => Some(guard.clone()),
            GuardRef::Named(name) => {
                let found = self.implementations.find_guard(name).cloned();
                self.require(found.is_some(), || DefinitionIssue::UnknownGuard {
                    state: state.to_string(),
                    guard: name.clone(),
                });
                found
            }
        }
    }

    /// Millisecond literals are fixed; anything else names a delay.
    fn delay(&mut self, state: &str, key: &str) -> Option<Delay> {
        if let Ok(millis) = key.parse::<u64>() {
            return Some(Delay::Fixed(Duration::from_millis(millis)));
        }
        let found = self.implementations.find_delay(key).cloned();
        self.require(found.is_some(), || DefinitionIssue::UnknownDelay {
            state: state.to_string(),
            delay: key.to_string(),
        });
        found.map(Delay::Named)
    }

    fn invoke(
        &mut self,
        state: &str,
        config: &InvokeConfig,
        siblings: &IndexMap<String, StateNodeConfig>,
    ) -> CompiledInvoke {
        let done_label = format!("done.invoke.{}", config.id);
        let error_label = format!("error.invoke.{}", config.id);
        CompiledInvoke {
            id: config.id.clone(),
            src: config.src.clone(),
            data: config.data.clone(),
            on_done: config
                .on_done
                .as_ref()
                .map(|reaction| self.reaction(state, &done_label, reaction, siblings)),
            on_error: config
                .on_error
                .as_ref()
                .map(|reaction| self.reaction(state, &error_label, reaction, siblings)),
        }
    }

    fn reaction(
        &mut self,
        state: &str,
        label: &str,
        reaction: &InvokeReaction,
        siblings: &IndexMap<String, StateNodeConfig>,
    ) -> Reaction {
        match reaction {
            InvokeReaction::Event(kind) => Reaction::Event(kind.clone()),
            InvokeReaction::Transition(transition) => {
                Reaction::Transition(self.transition(state, label, transition, siblings))
            }
        }
    }
}
