//! Running machines.
//!
//! An [`Interpreter`] owns one running machine: its current snapshot, the
//! after-timers armed for the active state and the children invoked by it.
//! Work arrives as envelopes in a mailbox and is processed one at a time, so
//! an event sent from inside an action, a listener or a child completion is
//! handled after the current step finishes.

mod error;
mod invoke;
mod registry;
mod subscription;

pub use error::{InterpreterStatus, InvokeError};
pub use registry::MachineRegistry;
pub use subscription::Subscription;

use crate::builder::ServiceRegistry;
use crate::core::{Context, Event, Meta, Snapshot, StateValue, TransitionHistory, TransitionRecord};
use crate::machine::{Machine, MachineError};
use crate::timer::{Timer, TimerCoordinator, TimerStatus};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, error, trace};
use uuid::Uuid;

type Listener = Rc<dyn Fn(&Snapshot)>;

/// A running instance of a [`Machine`].
///
/// Cloning yields another handle to the same instance.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::{MachineBuilder, StateBuilder};
/// use statecraft::interpreter::{Interpreter, InterpreterStatus};
/// use statecraft::timer::{ManualScheduler, TimerCoordinator};
/// use std::rc::Rc;
///
/// let machine = MachineBuilder::new("light")
///     .initial("green")
///     .state("green", StateBuilder::new().after_ms(1000, "yellow"))
///     .state("yellow", StateBuilder::new().on("TIMER", "red"))
///     .state("red", StateBuilder::final_state())
///     .build()
///     .unwrap();
///
/// let scheduler = Rc::new(ManualScheduler::new());
/// let light = Interpreter::new(machine, TimerCoordinator::new(scheduler.clone()));
/// light.start();
///
/// scheduler.advance_ms(1000);
/// assert!(light.state().matches("yellow"));
///
/// light.send("TIMER").unwrap();
/// assert!(light.state().matches("red"));
///
/// light.stop();
/// assert_eq!(light.status(), InterpreterStatus::Stopped);
/// ```
#[derive(Clone)]
pub struct Interpreter {
    shared: Rc<Shared>,
}

struct Shared {
    machine: Machine,
    session: Uuid,
    coordinator: TimerCoordinator,
    /// The machine's services layered over the parent's.
    services: ServiceRegistry,
    parent: Option<ParentLink>,
    core: RefCell<Core>,
    mailbox: RefCell<VecDeque<Envelope>>,
    busy: Cell<bool>,
    listeners: RefCell<Vec<(u64, Listener)>>,
    next_listener: Cell<u64>,
}

/// Route from a child back to the state that invoked it.
struct ParentLink {
    id: String,
    state: String,
    parent: Weak<Shared>,
}

struct Core {
    snapshot: Snapshot,
    status: InterpreterStatus,
    /// Keyed `{state}_{delay}`.
    timers: IndexMap<String, ArmedTimer>,
    /// Bumped whenever timers are re-armed; a callback is stale unless its
    /// generation is the one stored with its key.
    generation: u64,
    children: IndexMap<String, Interpreter>,
    history: TransitionHistory,
    done_reported: bool,
}

struct ArmedTimer {
    timer: Timer,
    generation: u64,
}

enum Envelope {
    Start,
    Event(Event),
    After {
        state: String,
        key: String,
        generation: u64,
    },
    ChildDone {
        id: String,
        state: String,
    },
    InvokeFailed {
        id: String,
        state: String,
        message: String,
    },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Rearm {
    Always,
    OnChange,
}

impl Interpreter {
    /// Create an interpreter resting at the machine's initial state.
    pub fn new(machine: Machine, coordinator: TimerCoordinator) -> Self {
        let services = machine.services().clone();
        Self::create(machine, coordinator, services, None)
    }

    fn create(
        machine: Machine,
        coordinator: TimerCoordinator,
        services: ServiceRegistry,
        parent: Option<ParentLink>,
    ) -> Self {
        let snapshot = machine.initial_state().clone();
        Self {
            shared: Rc::new(Shared {
                machine,
                session: Uuid::new_v4(),
                coordinator,
                services,
                parent,
                core: RefCell::new(Core {
                    snapshot,
                    status: InterpreterStatus::NotStarted,
                    timers: IndexMap::new(),
                    generation: 0,
                    children: IndexMap::new(),
                    history: TransitionHistory::new(),
                    done_reported: false,
                }),
                mailbox: RefCell::new(VecDeque::new()),
                busy: Cell::new(false),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
            }),
        }
    }

    /// Start at the initial state: run its entry actions, invoke its
    /// children and arm its after-timers.
    ///
    /// Only has an effect on an interpreter that was never started.
    pub fn start(&self) -> &Self {
        if self.status() != InterpreterStatus::NotStarted {
            return self;
        }
        self.shared.core.borrow_mut().status = InterpreterStatus::Running;
        debug!(
            machine = self.shared.machine.name(),
            session = %self.shared.session,
            "interpreter started"
        );
        // Errors are already logged by the drain and nothing can be returned
        // from a fluent start.
        let _ = self.shared.deliver(Envelope::Start);
        self
    }

    /// Start at `value` with the machine's default context. No entry actions
    /// run for the override state.
    pub fn start_at(&self, value: impl Into<StateValue>) -> Result<&Self, MachineError> {
        let context = Rc::clone(self.shared.machine.default_context());
        self.start_with(value, context.as_ref().clone())
    }

    /// Start at `value` with `context`.
    pub fn start_with(
        &self,
        value: impl Into<StateValue>,
        context: Context,
    ) -> Result<&Self, MachineError> {
        if self.status() != InterpreterStatus::NotStarted {
            return Ok(self);
        }
        let snapshot = self.shared.machine.snapshot_at(value.into(), Rc::new(context))?;
        self.shared.core.borrow_mut().snapshot = snapshot;
        Ok(self.start())
    }

    /// Process `event`.
    ///
    /// Does nothing unless the interpreter is running. Sent from inside a
    /// step (an action, a listener), the event is queued and `Ok` is
    /// returned; it is processed once the current step completes.
    pub fn send(&self, event: impl Into<Event>) -> Result<(), MachineError> {
        if !self.status().is_running() {
            return Ok(());
        }
        self.shared.deliver(Envelope::Event(event.into()))
    }

    /// Register `listener` and immediately call it with the current snapshot.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Snapshot) + 'static,
    {
        let listener: Listener = Rc::new(listener);
        let id = self.shared.next_listener.get();
        self.shared.next_listener.set(id + 1);
        if self.status() != InterpreterStatus::Stopped {
            self.shared
                .listeners
                .borrow_mut()
                .push((id, Rc::clone(&listener)));
        }
        listener(&self.state());
        Subscription::new(id, Rc::downgrade(&self.shared))
    }

    /// Stop this interpreter and, recursively, its children.
    ///
    /// Destroys every armed timer and drops every listener. Stopped is
    /// terminal.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Current snapshot.
    pub fn state(&self) -> Snapshot {
        self.shared.core.borrow().snapshot.clone()
    }

    pub fn status(&self) -> InterpreterStatus {
        self.shared.core.borrow().status
    }

    /// Running children, by invoke id.
    pub fn children(&self) -> IndexMap<String, Interpreter> {
        self.shared.core.borrow().children.clone()
    }

    pub fn child(&self, id: &str) -> Option<Interpreter> {
        self.shared.core.borrow().children.get(id).cloned()
    }

    /// Machine-level metadata.
    pub fn meta(&self) -> Option<&Meta> {
        self.shared.machine.meta()
    }

    pub fn machine(&self) -> &Machine {
        &self.shared.machine
    }

    pub fn coordinator(&self) -> &TimerCoordinator {
        &self.shared.coordinator
    }

    /// Identifier of this run, attached to every log line.
    pub fn session_id(&self) -> Uuid {
        self.shared.session
    }

    /// Value changes so far.
    pub fn history(&self) -> TransitionHistory {
        self.shared.core.borrow().history.clone()
    }

    /// Keys of the after-timers armed for the active state.
    pub fn armed_timers(&self) -> Vec<String> {
        self.shared.core.borrow().timers.keys().cloned().collect()
    }

    /// After-timer `{state}_{delay}` of the active state.
    pub fn timer(&self, key: &str) -> Option<Timer> {
        self.shared
            .core
            .borrow()
            .timers
            .get(key)
            .map(|armed| armed.timer.clone())
    }

    pub fn ptr_eq(&self, other: &Interpreter) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.core.borrow();
        f.debug_struct("Interpreter")
            .field("machine", &self.shared.machine.id())
            .field("session", &self.shared.session)
            .field("status", &core.status)
            .field("value", &core.snapshot.value)
            .field("children", &core.children.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Shared {
    fn status(&self) -> InterpreterStatus {
        self.core.borrow().status
    }

    fn running(&self) -> bool {
        self.status().is_running()
    }

    fn snapshot(&self) -> Snapshot {
        self.core.borrow().snapshot.clone()
    }

    /// Queue `envelope` and, unless a step is already in progress, drain the
    /// mailbox. Returns the first error met while draining.
    fn deliver(self: &Rc<Self>, envelope: Envelope) -> Result<(), MachineError> {
        self.mailbox.borrow_mut().push_back(envelope);
        if self.busy.replace(true) {
            return Ok(());
        }

        let mut outcome = Ok(());
        loop {
            let next = self.mailbox.borrow_mut().pop_front();
            let Some(envelope) = next else {
                break;
            };
            if let Err(failure) = self.process(envelope) {
                error!(
                    machine = self.machine.name(),
                    session = %self.session,
                    error = %failure,
                    "step failed"
                );
                if outcome.is_ok() {
                    outcome = Err(failure);
                }
            }
        }
        self.busy.set(false);
        outcome
    }

    fn process(self: &Rc<Self>, envelope: Envelope) -> Result<(), MachineError> {
        if !self.running() {
            return Ok(());
        }
        match envelope {
            Envelope::Start => self.enter_initial(),
            Envelope::Event(event) => {
                let current = self.snapshot();
                let next = self.machine.transition(&current.value, &current.context, &event)?;
                self.commit(next, &event, Rearm::Always)
            }
            Envelope::After {
                state,
                key,
                generation,
            } => self.fire_after(&state, &key, generation),
            Envelope::ChildDone { id, state } => self.child_done(&id, &state),
            Envelope::InvokeFailed { id, state, message } => {
                self.invoke_failed(&id, &state, message)
            }
        }
    }

    fn enter_initial(self: &Rc<Self>) -> Result<(), MachineError> {
        let snapshot = self.snapshot();
        let init = Event::init();
        for action in &snapshot.actions {
            if !self.running() {
                return Ok(());
            }
            action.execute(&snapshot.context, &init);
        }
        if self.running() {
            self.start_children()?;
        }
        if self.running() {
            self.arm_timers()?;
        }
        self.report_done_if_final(&snapshot.value);
        Ok(())
    }

    fn fire_after(self: &Rc<Self>, state: &str, key: &str, generation: u64) -> Result<(), MachineError> {
        let current = {
            let core = self.core.borrow();
            let fresh = core.snapshot.value.as_leaf() == Some(state)
                && core
                    .timers
                    .get(&format!("{state}_{key}"))
                    .is_some_and(|armed| armed.generation == generation);
            fresh.then(|| core.snapshot.clone())
        };
        let Some(current) = current else {
            trace!(
                machine = self.machine.name(),
                session = %self.session,
                state,
                delay = key,
                "stale after-timer ignored"
            );
            return Ok(());
        };

        let event = Event::after(key);
        debug!(
            machine = self.machine.name(),
            session = %self.session,
            state,
            event = %event.kind,
            "after-timer fired"
        );
        match self.machine.fire_after(state, key, &current.context, &event)? {
            Some(next) => self.commit(next, &event, Rearm::OnChange),
            None => Ok(()),
        }
    }

    /// Store `next`, then run its actions, swap children, notify listeners
    /// and re-arm timers, checking between each step that the interpreter
    /// was not stopped along the way.
    fn commit(self: &Rc<Self>, next: Snapshot, event: &Event, rearm: Rearm) -> Result<(), MachineError> {
        let value_changed = {
            let mut core = self.core.borrow_mut();
            let value_changed = core.snapshot.value != next.value;
            if value_changed {
                let record = TransitionRecord::now(
                    core.snapshot.value.clone(),
                    next.value.clone(),
                    event.kind.clone(),
                );
                core.history = core.history.record(record);
            }
            core.snapshot = next.clone();
            value_changed
        };
        debug!(
            machine = self.machine.name(),
            session = %self.session,
            state = %next.value,
            event = %event.kind,
            changed = next.changed,
            "transition"
        );

        for action in &next.actions {
            if !self.running() {
                return Ok(());
            }
            action.execute(&next.context, event);
        }

        if value_changed {
            self.stop_children();
            if self.running() {
                self.start_children()?;
            }
        }

        if !self.running() {
            return Ok(());
        }
        self.notify(&next);

        if self.running() && (rearm == Rearm::Always || value_changed) {
            self.arm_timers()?;
        }
        self.report_done_if_final(&next.value);
        Ok(())
    }

    fn notify(&self, snapshot: &Snapshot) {
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
    }

    pub(super) fn remove_listener(&self, id: u64) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener, _)| *listener != id);
        listeners.len() != before
    }

    pub(super) fn has_listener(&self, id: u64) -> bool {
        self.listeners.borrow().iter().any(|(listener, _)| *listener == id)
    }

    /// Cancel every armed timer and arm the active state's after-timers.
    ///
    /// A paused after-timer of the active state is kept as it is, so a
    /// standby or a global pause is not undone by the re-arm that follows
    /// the event which requested it. Delays resolve with the
    /// `statecraft.after.<delay>` event.
    fn arm_timers(self: &Rc<Self>) -> Result<(), MachineError> {
        let (mut previous, generation, current) = {
            let mut core = self.core.borrow_mut();
            core.generation += 1;
            (
                std::mem::take(&mut core.timers),
                core.generation,
                core.snapshot.clone(),
            )
        };

        let mut armed = IndexMap::new();
        let active = match (self.machine.flat(), current.value.as_leaf()) {
            (Some(table), Some(state)) => Some((state, table.node(state)?)),
            _ => None,
        };
        if let Some((state, node)) = active {
            for after in &node.after {
                let key = format!("{state}_{}", after.key);
                match previous.shift_remove(&key) {
                    Some(kept) if kept.timer.status() == TimerStatus::Paused => {
                        armed.insert(key, kept);
                        continue;
                    }
                    Some(replaced) => replaced.timer.destroy(),
                    None => {}
                }

                let event = Event::after(&after.key);
                let delay = after.delay.resolve(&current.context, &event, node.meta.as_ref());
                let weak = Rc::downgrade(self);
                let envelope_state = state.to_string();
                let delay_key = after.key.clone();
                let timer = self.coordinator.new_timer_with(delay, move || {
                    if let Some(shared) = weak.upgrade() {
                        let _ = shared.deliver(Envelope::After {
                            state: envelope_state,
                            key: delay_key,
                            generation,
                        });
                    }
                });
                let started = timer.start();
                trace!(
                    machine = self.machine.name(),
                    session = %self.session,
                    state,
                    delay_ms = delay.as_millis() as u64,
                    started,
                    "after-timer armed"
                );
                armed.insert(key, ArmedTimer { timer, generation });
            }
        }
        for stale in previous.values() {
            stale.timer.destroy();
        }
        self.core.borrow_mut().timers = armed;
        Ok(())
    }

    fn report_done_if_final(&self, value: &StateValue) {
        if !self.running() || !self.machine.is_final(value) {
            return;
        }
        {
            let mut core = self.core.borrow_mut();
            if core.done_reported {
                return;
            }
            core.done_reported = true;
        }
        debug!(
            machine = self.machine.name(),
            session = %self.session,
            state = %value,
            "reached final state"
        );
        let Some(link) = &self.parent else {
            return;
        };
        if let Some(parent) = link.parent.upgrade() {
            let _ = parent.deliver(Envelope::ChildDone {
                id: link.id.clone(),
                state: link.state.clone(),
            });
        }
    }

    fn stop(&self) {
        let (timers, children) = {
            let mut core = self.core.borrow_mut();
            if core.status == InterpreterStatus::Stopped {
                return;
            }
            core.status = InterpreterStatus::Stopped;
            core.generation += 1;
            (
                std::mem::take(&mut core.timers),
                std::mem::take(&mut core.children),
            )
        };
        for armed in timers.values() {
            armed.timer.destroy();
        }
        for child in children.values() {
            child.stop();
        }
        self.listeners.borrow_mut().clear();
        self.mailbox.borrow_mut().clear();
        debug!(
            machine = self.machine.name(),
            session = %self.session,
            "interpreter stopped"
        );
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        for armed in self.core.get_mut().timers.values() {
            armed.timer.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Implementations, MachineBuilder, StateBuilder, TransitionBuilder};
    use crate::core::{Action, Properties};
    use crate::timer::{ManualScheduler, TimerStatus};
    use serde_json::json;

    fn runtime() -> (Rc<ManualScheduler>, TimerCoordinator) {
        let scheduler = Rc::new(ManualScheduler::new());
        let coordinator = TimerCoordinator::new(scheduler.clone());
        (scheduler, coordinator)
    }

    fn recorder() -> (Rc<RefCell<Vec<String>>>, Implementations) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let implementations = Implementations::new().action("record", move |_, event, _| {
            sink.borrow_mut().push(event.kind.clone())
        });
        (log, implementations)
    }

    #[test]
    fn start_runs_initial_entry_actions_once() {
        let (log, implementations) = recorder();
        let machine = MachineBuilder::new("m")
            .initial("A")
            .state("A", StateBuilder::new().entry("record"))
            .implementations(implementations)
            .build()
            .unwrap();
        let (_, coordinator) = runtime();

        let interpreter = Interpreter::new(machine, coordinator);
        assert_eq!(interpreter.status(), InterpreterStatus::NotStarted);
        interpreter.start();
        interpreter.start();

        assert_eq!(interpreter.status(), InterpreterStatus::Running);
        assert_eq!(*log.borrow(), vec![crate::core::INIT_EVENT.to_string()]);
    }

    #[test]
    fn send_is_ignored_before_start_and_after_stop() {
        let machine = MachineBuilder::new("m")
            .initial("A")
            .state("A", StateBuilder::new().on("NEXT", "B"))
            .state("B", StateBuilder::new())
            .build()
            .unwrap();
        let (_, coordinator) = runtime();
        let interpreter = Interpreter::new(machine, coordinator);

        interpreter.send("NEXT").unwrap();
        assert!(interpreter.state().matches("A"));

        interpreter.start();
        interpreter.stop();
        interpreter.send("NEXT").unwrap();
        assert!(interpreter.state().matches("A"));
        assert_eq!(interpreter.status(), InterpreterStatus::Stopped);
    }

    #[test]
    fn subscribe_replays_and_unsubscribe_detaches() {
        let machine = MachineBuilder::new("m")
            .initial("A")
            .state("A", StateBuilder::new().on("NEXT", "B"))
            .state("B", StateBuilder::new().on("NEXT", "A"))
            .build()
            .unwrap();
        let (_, coordinator) = runtime();
        let interpreter = Interpreter::new(machine, coordinator);
        interpreter.start();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let subscription = interpreter.subscribe(move |snapshot| {
            sink.borrow_mut().push(snapshot.value.to_string());
        });
        assert!(subscription.is_active());

        interpreter.send("NEXT").unwrap();
        subscription.unsubscribe();
        interpreter.send("NEXT").unwrap();

        assert_eq!(*seen.borrow(), vec!["A", "B"]);
    }

    #[test]
    fn listeners_hear_unchanged_snapshots() {
        let machine = MachineBuilder::new("m")
            .initial("A")
            .state("A", StateBuilder::new())
            .build()
            .unwrap();
        let (_, coordinator) = runtime();
        let interpreter = Interpreter::new(machine, coordinator);
        interpreter.start();

        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        let _subscription = interpreter.subscribe(move |snapshot| sink.borrow_mut().push(snapshot.changed));
        interpreter.send("IGNORED").unwrap();

        assert_eq!(*changes.borrow(), vec![false, false]);
    }

    #[test]
    fn start_at_overrides_value_without_actions() {
        let (log, implementations) = recorder();
        let machine = MachineBuilder::new("m")
            .initial("A")
            .state("A", StateBuilder::new().entry("record"))
            .state("B", StateBuilder::new().entry("record").on("BACK", "A"))
            .implementations(implementations)
            .build()
            .unwrap();
        let (_, coordinator) = runtime();
        let interpreter = Interpreter::new(machine, coordinator);

        interpreter.start_at("B").unwrap();
        assert!(interpreter.state().matches("B"));
        assert!(log.borrow().is_empty());

        interpreter.send("BACK").unwrap();
        assert_eq!(*log.borrow(), vec!["BACK"]);
    }

    #[test]
    fn start_at_unknown_state_is_fatal() {
        let machine = MachineBuilder::new("m")
            .initial("A")
            .state("A", StateBuilder::new())
            .build()
            .unwrap();
        let (_, coordinator) = runtime();
        let interpreter = Interpreter::new(machine, coordinator);

        let result = interpreter.start_at("Z");
        assert!(matches!(result, Err(MachineError::UnknownState { .. })));
        assert_eq!(interpreter.status(), InterpreterStatus::NotStarted);
    }

    #[test]
    fn start_with_uses_the_given_context() {
        let machine = MachineBuilder::new("m")
            .initial("A")
            .with("count", 0)
            .state("A", StateBuilder::new())
            .build()
            .unwrap();
        let (_, coordinator) = runtime();
        let interpreter = Interpreter::new(machine, coordinator);

        let mut context = Context::new();
        context.insert("count".into(), json!(9));
        interpreter.start_with("A", context).unwrap();

        assert_eq!(interpreter.state().context["count"], json!(9));
    }

    #[test]
    fn events_sent_from_actions_are_queued() {
        let outbox: Rc<RefCell<Option<Interpreter>>> = Rc::new(RefCell::new(None));
        let handle = Rc::clone(&outbox);
        let order = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&order);

        let machine = MachineBuilder::new("m")
            .initial("A")
            .state(
                "A",
                StateBuilder::new().on("GO", TransitionBuilder::new().to("B").action("forward")),
            )
            .state("B", StateBuilder::new().on("NEXT", "C"))
            .state("C", StateBuilder::new())
            .implementations(Implementations::new().action("forward", move |_, _, _| {
                if let Some(interpreter) = handle.borrow().as_ref() {
                    interpreter.send("NEXT").unwrap();
                    seen.borrow_mut().push(interpreter.state().value.to_string());
                }
            }))
            .build()
            .unwrap();
        let (_, coordinator) = runtime();
        let interpreter = Interpreter::new(machine, coordinator);
        *outbox.borrow_mut() = Some(interpreter.clone());
        interpreter.start();

        interpreter.send("GO").unwrap();

        // NEXT was processed after GO had been fully committed.
        assert_eq!(*order.borrow(), vec!["B"]);
        assert!(interpreter.state().matches("C"));
        outbox.borrow_mut().take();
    }

    #[test]
    fn history_records_value_changes_only() {
        let machine = MachineBuilder::new("m")
            .initial("A")
            .with("count", 0)
            .state(
                "A",
                StateBuilder::new()
                    .on("NEXT", "B")
                    .on(
                        "POKE",
                        TransitionBuilder::new()
                            .action(Action::assign_properties(Properties::new().set("count", 1))),
                    ),
            )
            .state("B", StateBuilder::new())
            .build()
            .unwrap();
        let (_, coordinator) = runtime();
        let interpreter = Interpreter::new(machine, coordinator);
        interpreter.start();

        interpreter.send("POKE").unwrap();
        interpreter.send("NEXT").unwrap();

        let history = interpreter.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history.transitions()[0].event, "NEXT");
        assert_eq!(
            history.get_path(),
            vec![&StateValue::from("A"), &StateValue::from("B")]
        );
    }

    #[test]
    fn stop_destroys_armed_timers() {
        let machine = MachineBuilder::new("m")
            .initial("A")
            .state("A", StateBuilder::new().after_ms(1000, "B"))
            .state("B", StateBuilder::new())
            .build()
            .unwrap();
        let (scheduler, coordinator) = runtime();
        let interpreter = Interpreter::new(machine, coordinator);
        interpreter.start();

        let timer = interpreter.timer("A_1000").unwrap();
        assert!(timer.is_running());

        interpreter.stop();
        assert_eq!(timer.status(), TimerStatus::Destroyed);
        assert!(interpreter.armed_timers().is_empty());

        scheduler.advance_ms(2000);
        assert!(interpreter.state().matches("A"));
    }

    #[test]
    fn dropping_the_last_handle_cancels_timers() {
        let machine = MachineBuilder::new("m")
            .initial("A")
            .state("A", StateBuilder::new().after_ms(1000, "B"))
            .state("B", StateBuilder::new())
            .build()
            .unwrap();
        let (scheduler, coordinator) = runtime();
        let interpreter = Interpreter::new(machine, coordinator);
        interpreter.start();
        let timer = interpreter.timer("A_1000").unwrap();

        drop(interpreter);

        assert_eq!(timer.status(), TimerStatus::Destroyed);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn machine_meta_is_exposed() {
        let machine = MachineBuilder::new("m")
            .initial("A")
            .meta(json!({"placement": "preroll"}))
            .state("A", StateBuilder::new())
            .build()
            .unwrap();
        let (_, coordinator) = runtime();
        let interpreter = Interpreter::new(machine, coordinator);

        assert_eq!(interpreter.meta(), Some(&json!({"placement": "preroll"})));
    }
}
