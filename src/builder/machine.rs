//! Builders for constructing machine descriptors from code.

use crate::builder::error::BuildError;
use crate::builder::implementations::Implementations;
use crate::config::{InvokeConfig, MachineConfig, NodeKind, StateNodeConfig, TransitionConfig};
use crate::core::{Action, Context, Meta};
use crate::machine::Machine;
use serde_json::Value;

/// Builder for constructing machines with a fluent API.
///
/// Produces the same [`MachineConfig`] a JSON descriptor would, then compiles
/// it.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::{MachineBuilder, StateBuilder};
///
/// let machine = MachineBuilder::new("toggle")
///     .initial("off")
///     .state("off", StateBuilder::new().on("FLIP", "on"))
///     .state("on", StateBuilder::new().on("FLIP", "off"))
///     .build()
///     .unwrap();
///
/// let next = machine.transition_from("off", &"FLIP".into()).unwrap();
/// assert!(next.matches("on"));
/// ```
pub struct MachineBuilder {
    config: MachineConfig,
    implementations: Implementations,
}

impl MachineBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            config: MachineConfig {
                id: Some(id.into()),
                ..MachineConfig::default()
            },
            implementations: Implementations::new(),
        }
    }

    /// Set the initial state (required unless the machine is parallel).
    pub fn initial(mut self, state: impl Into<String>) -> Self {
        self.config.initial = Some(state.into());
        self
    }

    /// Make every state a region running in parallel.
    pub fn parallel(mut self) -> Self {
        self.config.kind = NodeKind::Parallel;
        self
    }

    pub fn context(mut self, context: Context) -> Self {
        self.config.context = context;
        self
    }

    /// Set a single key of the default context.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.context.insert(key.into(), value.into());
        self
    }

    pub fn meta(mut self, meta: Meta) -> Self {
        self.config.meta = Some(meta);
        self
    }

    /// Add a state, or a region for parallel machines.
    pub fn state(mut self, key: impl Into<String>, state: StateBuilder) -> Self {
        self.config.states.insert(key.into(), state.build());
        self
    }

    pub fn implementations(mut self, implementations: Implementations) -> Self {
        self.implementations = implementations;
        self
    }

    pub fn into_config(self) -> MachineConfig {
        self.config
    }

    /// Compile the machine.
    /// Returns an error if the initial state is missing or a name cannot be
    /// resolved.
    pub fn build(self) -> Result<Machine, BuildError> {
        Machine::compile(self.config, self.implementations)
    }
}

/// Builder for a single state node or region.
#[derive(Default)]
pub struct StateBuilder {
    node: StateNodeConfig,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A state that completes the machine once reached.
    pub fn final_state() -> Self {
        let mut builder = Self::new();
        builder.node.kind = NodeKind::Final;
        builder
    }

    /// Add a candidate transition for `event`. Candidates are tried in the
    /// order they are added.
    pub fn on(mut self, event: impl Into<String>, transition: impl Into<TransitionConfig>) -> Self {
        self.node
            .on
            .entry(event.into())
            .or_default()
            .push(transition.into());
        self
    }

    pub fn entry(mut self, action: impl Into<Action>) -> Self {
        self.node.entry.push(action.into());
        self
    }

    pub fn exit(mut self, action: impl Into<Action>) -> Self {
        self.node.exit.push(action.into());
        self
    }

    /// Add a delayed transition keyed by a named delay.
    pub fn after(mut self, delay: impl Into<String>, transition: impl Into<TransitionConfig>) -> Self {
        self.node
            .after
            .entry(delay.into())
            .or_default()
            .push(transition.into());
        self
    }

    /// Add a delayed transition with a literal delay.
    pub fn after_ms(self, millis: u64, transition: impl Into<TransitionConfig>) -> Self {
        self.after(millis.to_string(), transition)
    }

    pub fn invoke(mut self, invoke: InvokeConfig) -> Self {
        self.node.invoke.push(invoke);
        self
    }

    pub fn meta(mut self, meta: Meta) -> Self {
        self.node.meta = Some(meta);
        self
    }

    /// Initial sub-state, for regions.
    pub fn initial(mut self, state: impl Into<String>) -> Self {
        self.node.initial = Some(state.into());
        self
    }

    /// Add a sub-state, for regions.
    pub fn state(mut self, key: impl Into<String>, state: StateBuilder) -> Self {
        self.node.states.insert(key.into(), state.build());
        self
    }

    pub fn build(self) -> StateNodeConfig {
        self.node
    }
}
