//! Machine and interpreter cache keyed by machine id.

use super::Interpreter;
use crate::builder::{BuildError, Implementations};
use crate::config::MachineConfig;
use crate::machine::Machine;
use crate::timer::{Scheduler, TimerCoordinator};
use indexmap::IndexMap;
use std::rc::Rc;
use tracing::debug;

/// Compiles machines once per id and hands out one interpreter per machine.
///
/// Every interpreter created here shares the registry's timer coordinator, so
/// `pause_all`, `standby` and `wake` act on all of them at once.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::Implementations;
/// use statecraft::config::MachineConfig;
/// use statecraft::interpreter::MachineRegistry;
/// use statecraft::timer::ManualScheduler;
/// use std::rc::Rc;
///
/// let mut registry = MachineRegistry::with_scheduler(Rc::new(ManualScheduler::new()));
/// let config = MachineConfig::from_json(r#"{
///     "id": "toggle",
///     "initial": "off",
///     "states": {"off": {"on": {"FLIP": "on"}}, "on": {"on": {"FLIP": "off"}}}
/// }"#).unwrap();
///
/// let machine = registry.create_machine(config, Implementations::new()).unwrap();
/// let toggle = registry.interpret(&machine).unwrap();
/// toggle.start();
/// toggle.send("FLIP").unwrap();
///
/// let same = registry.interpret(&machine).unwrap();
/// assert!(same.state().matches("on"));
/// ```
#[derive(Debug)]
pub struct MachineRegistry {
    coordinator: TimerCoordinator,
    machines: IndexMap<String, Machine>,
    interpreters: IndexMap<String, Interpreter>,
}

impl MachineRegistry {
    pub fn new(coordinator: TimerCoordinator) -> Self {
        Self {
            coordinator,
            machines: IndexMap::new(),
            interpreters: IndexMap::new(),
        }
    }

    pub fn with_scheduler(scheduler: Rc<dyn Scheduler>) -> Self {
        Self::new(TimerCoordinator::new(scheduler))
    }

    /// Compile `config`, or return the machine already registered under its
    /// id.
    pub fn create_machine(
        &mut self,
        config: MachineConfig,
        implementations: Implementations,
    ) -> Result<Machine, BuildError> {
        let id = config.id.clone().ok_or(BuildError::MissingMachineId)?;
        if let Some(machine) = self.machines.get(&id) {
            return Ok(machine.clone());
        }
        let machine = Machine::compile(config, implementations)?;
        debug!(machine = %id, "machine registered");
        self.machines.insert(id, machine.clone());
        Ok(machine)
    }

    /// The interpreter for `machine`, created on first use.
    pub fn interpret(&mut self, machine: &Machine) -> Result<Interpreter, BuildError> {
        let id = machine.id().ok_or(BuildError::MissingMachineId)?;
        let interpreter = self
            .interpreters
            .entry(id.to_string())
            .or_insert_with(|| Interpreter::new(machine.clone(), self.coordinator.clone()));
        Ok(interpreter.clone())
    }

    pub fn machine(&self, id: &str) -> Option<&Machine> {
        self.machines.get(id)
    }

    pub fn interpreter(&self, id: &str) -> Option<&Interpreter> {
        self.interpreters.get(id)
    }

    /// Forget one id, or everything. Handles already given out keep working.
    pub fn clear(&mut self, id: Option<&str>) {
        match id {
            Some(id) => {
                self.machines.shift_remove(id);
                self.interpreters.shift_remove(id);
            }
            None => {
                self.machines.clear();
                self.interpreters.clear();
            }
        }
    }

    pub fn coordinator(&self) -> &TimerCoordinator {
        &self.coordinator
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}
