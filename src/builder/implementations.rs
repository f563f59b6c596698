//! Implementation bundles: the code behind the names in a descriptor.

use crate::config::MachineFactory;
use crate::core::{ActionFn, Assigner, Context, Event, Guard, Meta, Properties};
use crate::interpreter::InvokeError;
use crate::machine::Machine;
use crate::timer::TimerCoordinator;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Resolves a named delay to milliseconds.
pub type DelayFn = Rc<dyn Fn(&Context, &Event, Option<&Meta>) -> u64>;

/// Body of a named action.
#[derive(Clone)]
pub enum ActionImpl {
    Exec(ActionFn),
    Assign(Assigner),
}

/// Named child machine factories.
///
/// Children inherit their parent's registry; entries of the child's own
/// registry take precedence.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, MachineFactory>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Context, &Event) -> Result<Machine, InvokeError> + 'static,
    {
        self.services.insert(name.into(), Rc::new(factory));
    }

    pub fn get(&self, name: &str) -> Option<&MachineFactory> {
        self.services.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// This registry layered over `fallback`.
    pub fn merged_with(&self, fallback: &ServiceRegistry) -> ServiceRegistry {
        let mut services = fallback.services.clone();
        services.extend(
            self.services
                .iter()
                .map(|(name, factory)| (name.clone(), Rc::clone(factory))),
        );
        ServiceRegistry { services }
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(sorted(self.services.keys())).finish()
    }
}

/// Actions, guards, delays and services referenced by name from descriptors.
///
/// Built with a fluent API and consumed by
/// [`Machine::compile`](crate::machine::Machine::compile), which rejects any
/// name the bundle cannot resolve.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::Implementations;
/// use statecraft::core::Properties;
/// use serde_json::json;
///
/// let implementations = Implementations::new()
///     .action("log", |_, event, _| println!("got {}", event.kind))
///     .assign_properties("reset", Properties::new().set("progress", 0))
///     .guard("canPlay", |ctx, _, _| ctx.get("canPlay") == Some(&json!(true)))
///     .delay("skipDelay", |ctx, _, _| ctx["skipAfterMs"].as_u64().unwrap_or(5000));
///
/// assert!(implementations.has_action("log"));
/// assert!(implementations.has_guard("canPlay"));
/// ```
#[derive(Clone, Default)]
pub struct Implementations {
    actions: HashMap<String, ActionImpl>,
    guards: HashMap<String, Guard>,
    delays: HashMap<String, DelayFn>,
    services: ServiceRegistry,
}

impl Implementations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a side-effecting action.
    pub fn action<F>(mut self, name: impl Into<String>, exec: F) -> Self
    where
        F: Fn(&Context, &Event, Option<&Meta>) + 'static,
    {
        self.actions
            .insert(name.into(), ActionImpl::Exec(Rc::new(exec)));
        self
    }

    /// Register an assign action computing a partial context.
    pub fn assign<F>(mut self, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&Context, &Event, Option<&Meta>) -> Context + 'static,
    {
        self.actions.insert(
            name.into(),
            ActionImpl::Assign(Assigner::Transform(Rc::new(transform))),
        );
        self
    }

    /// Register an assign action from a per-key map.
    pub fn assign_properties(mut self, name: impl Into<String>, properties: Properties) -> Self {
        self.actions
            .insert(name.into(), ActionImpl::Assign(Assigner::Properties(properties)));
        self
    }

    pub fn guard<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Context, &Event, Option<&Meta>) -> bool + 'static,
    {
        self.guards.insert(name.into(), Guard::new(predicate));
        self
    }

    /// Register a named delay returning milliseconds.
    pub fn delay<F>(mut self, name: impl Into<String>, delay: F) -> Self
    where
        F: Fn(&Context, &Event, Option<&Meta>) -> u64 + 'static,
    {
        self.delays.insert(name.into(), Rc::new(delay));
        self
    }

    pub fn service<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Context, &Event) -> Result<Machine, InvokeError> + 'static,
    {
        self.services.register(name, factory);
        self
    }

    /// Replace the service registry.
    pub fn services(mut self, services: ServiceRegistry) -> Self {
        self.services = services;
        self
    }

    /// Register `standbyTimers` and `wakeTimers` bound to `coordinator`.
    pub fn with_timer_actions(self, coordinator: &TimerCoordinator) -> Self {
        let standby = coordinator.clone();
        let wake = coordinator.clone();
        self.action("standbyTimers", move |_, _, _| standby.standby())
            .action("wakeTimers", move |_, _, _| wake.wake())
    }

    /// Layer `other` over this bundle; entries of `other` win.
    pub fn merge(mut self, other: Implementations) -> Self {
        self.actions.extend(other.actions);
        self.guards.extend(other.guards);
        self.delays.extend(other.delays);
        self.services = other.services.merged_with(&self.services);
        self
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn has_guard(&self, name: &str) -> bool {
        self.guards.contains_key(name)
    }

    pub fn has_delay(&self, name: &str) -> bool {
        self.delays.contains_key(name)
    }

    pub fn service_registry(&self) -> &ServiceRegistry {
        &self.services
    }

    pub(crate) fn find_action(&self, name: &str) -> Option<&ActionImpl> {
        self.actions.get(name)
    }

    pub(crate) fn find_guard(&self, name: &str) -> Option<&Guard> {
        self.guards.get(name)
    }

    pub(crate) fn find_delay(&self, name: &str) -> Option<&DelayFn> {
        self.delays.get(name)
    }
}

impl fmt::Debug for Implementations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementations")
            .field("actions", &sorted(self.actions.keys()))
            .field("guards", &sorted(self.guards.keys()))
            .field("delays", &sorted(self.delays.keys()))
            .field("services", &self.services)
            .finish()
    }
}

fn sorted<'a>(names: impl Iterator<Item = &'a String>) -> Vec<&'a String> {
    let mut names: Vec<_> = names.collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{ManualScheduler, TimerStatus};
    use std::time::Duration;

    fn failing(message: &'static str) -> impl Fn(&Context, &Event) -> Result<Machine, InvokeError> {
        move |_, _| Err(InvokeError::Failed(message.to_string()))
    }

    fn failure_of(registry: &ServiceRegistry, name: &str) -> Option<String> {
        let factory = registry.get(name)?;
        match factory(&Context::new(), &Event::init()) {
            Err(InvokeError::Failed(message)) => Some(message),
            _ => None,
        }
    }

    #[test]
    fn merge_prefers_the_later_bundle() {
        let base = Implementations::new()
            .guard("ready", |_, _, _| false)
            .delay("wait", |_, _, _| 10);
        let specific = Implementations::new().guard("ready", |_, _, _| true);

        let merged = base.merge(specific);
        let guard = merged.find_guard("ready").unwrap();

        assert!(guard.check(&Context::new(), &Event::new("E"), None));
        assert!(merged.has_delay("wait"));
    }

    #[test]
    fn child_services_shadow_parent_services() {
        let mut parent = ServiceRegistry::new();
        parent.register("video", failing("parent video"));
        parent.register("image", failing("parent image"));
        let mut child = ServiceRegistry::new();
        child.register("video", failing("child video"));

        let merged = child.merged_with(&parent);

        assert_eq!(merged.len(), 2);
        assert_eq!(failure_of(&merged, "video").as_deref(), Some("child video"));
        assert_eq!(failure_of(&merged, "image").as_deref(), Some("parent image"));
    }

    #[test]
    fn timer_actions_drive_the_coordinator() {
        let scheduler = Rc::new(ManualScheduler::new());
        let coordinator = TimerCoordinator::new(scheduler);
        let timer = coordinator.new_timer(Duration::from_millis(100));
        timer.start();

        let implementations = Implementations::new().with_timer_actions(&coordinator);
        let run = |name: &str| match implementations.find_action(name) {
            Some(ActionImpl::Exec(exec)) => exec(&Context::new(), &Event::new("E"), None),
            _ => panic!("missing action {name}"),
        };

        run("standbyTimers");
        assert_eq!(timer.status(), TimerStatus::Paused);
        assert_eq!(coordinator.stashed(), 1);

        run("wakeTimers");
        assert!(timer.is_running());
        assert_eq!(coordinator.stashed(), 0);
    }
}
