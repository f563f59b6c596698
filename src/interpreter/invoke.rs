//! Invocation manager: children owned by the active state.

use super::{Envelope, Interpreter, InvokeError, ParentLink, Rearm, Shared};
use crate::config::InvokeSource;
use crate::core::{Context, Event};
use crate::machine::{CompiledInvoke, Machine, MachineError, Reaction};
use std::rc::Rc;
use tracing::{debug, trace, warn};

impl Shared {
    /// Start the children invoked by the active state that are not running
    /// yet. Failures are logged and queued for `onError`.
    pub(super) fn start_children(self: &Rc<Self>) -> Result<(), MachineError> {
        let Some(table) = self.machine.flat() else {
            return Ok(());
        };
        let current = self.snapshot();
        let Some(state) = current.value.as_leaf() else {
            return Ok(());
        };
        let node = table.node(state)?;

        for invoke in &node.invoke {
            if !self.running() {
                break;
            }
            if self.core.borrow().children.contains_key(&invoke.id) {
                continue;
            }

            match self.resolve_child(invoke, &current.context) {
                Ok(machine) => {
                    let child = self.spawn(machine, &invoke.id, state);
                    self.core
                        .borrow_mut()
                        .children
                        .insert(invoke.id.clone(), child.clone());
                    debug!(
                        machine = self.machine.name(),
                        session = %self.session,
                        state,
                        child = %invoke.id,
                        child_session = %child.session_id(),
                        "child started"
                    );
                    child.start();
                }
                Err(failure) => {
                    warn!(
                        machine = self.machine.name(),
                        session = %self.session,
                        state,
                        child = %invoke.id,
                        error = %failure,
                        "invoke failed"
                    );
                    self.mailbox.borrow_mut().push_back(Envelope::InvokeFailed {
                        id: invoke.id.clone(),
                        state: state.to_string(),
                        message: failure.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Stop and forget every child.
    pub(super) fn stop_children(&self) {
        let children = std::mem::take(&mut self.core.borrow_mut().children);
        for (id, child) in &children {
            child.stop();
            trace!(
                machine = self.machine.name(),
                session = %self.session,
                child = %id,
                "child stopped"
            );
        }
    }

    /// Inline factories get the parent context; registered services get the
    /// invoke's data, or an empty context when there is none.
    fn resolve_child(&self, invoke: &CompiledInvoke, context: &Context) -> Result<Machine, InvokeError> {
        let init = Event::init();
        match &invoke.src {
            InvokeSource::Factory(factory) => factory(context, &init),
            InvokeSource::Service(name) => {
                let factory = self
                    .services
                    .get(name)
                    .ok_or_else(|| InvokeError::UnknownService(name.clone()))?;
                match &invoke.data {
                    Some(data) => factory(&data.resolve(context, &init), &init),
                    None => factory(&Context::new(), &init),
                }
            }
        }
    }

    fn spawn(self: &Rc<Self>, machine: Machine, id: &str, state: &str) -> Interpreter {
        let services = machine.services().merged_with(&self.services);
        Interpreter::create(
            machine,
            self.coordinator.clone(),
            services,
            Some(ParentLink {
                id: id.to_string(),
                state: state.to_string(),
                parent: Rc::downgrade(self),
            }),
        )
    }

    /// The invoke `id` of `state`, if that state is still active.
    fn active_invoke(&self, id: &str, state: &str) -> Option<&CompiledInvoke> {
        let active = self.core.borrow().snapshot.value.as_leaf() == Some(state);
        if !active {
            return None;
        }
        self.machine.flat()?.states.get(state)?.invoke(id)
    }

    pub(super) fn child_done(self: &Rc<Self>, id: &str, state: &str) -> Result<(), MachineError> {
        let alive = self.core.borrow().children.contains_key(id);
        let invoke = self.active_invoke(id, state).filter(|_| alive);
        let Some(invoke) = invoke else {
            trace!(
                machine = self.machine.name(),
                session = %self.session,
                child = id,
                "completion of a stopped child ignored"
            );
            return Ok(());
        };
        debug!(
            machine = self.machine.name(),
            session = %self.session,
            state,
            child = id,
            "child done"
        );
        match &invoke.on_done {
            Some(reaction) => self.react(state, reaction, Event::done_invoke(id)),
            None => Ok(()),
        }
    }

    pub(super) fn invoke_failed(
        self: &Rc<Self>,
        id: &str,
        state: &str,
        message: String,
    ) -> Result<(), MachineError> {
        let Some(invoke) = self.active_invoke(id, state) else {
            return Ok(());
        };
        match &invoke.on_error {
            Some(reaction) => self.react(state, reaction, Event::invoke_error(id, message)),
            None => Ok(()),
        }
    }

    /// A bare event name is processed as that event, carrying the payload of
    /// `event`; a transition is taken from `state` with `event`.
    fn react(self: &Rc<Self>, state: &str, reaction: &Reaction, event: Event) -> Result<(), MachineError> {
        match reaction {
            Reaction::Event(kind) => {
                let forwarded = Event {
                    kind: kind.clone(),
                    payload: event.payload,
                };
                self.process(Envelope::Event(forwarded))
            }
            Reaction::Transition(transition) => {
                let context = Rc::clone(&self.core.borrow().snapshot.context);
                match self.machine.react(state, transition, &context, &event)? {
                    Some(next) => self.commit(next, &event, Rearm::Always),
                    None => Ok(()),
                }
            }
        }
    }
}
