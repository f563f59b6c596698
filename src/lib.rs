//! Statecraft: an embeddable statechart interpreter
//!
//! Machines are described by serializable descriptors (usually JSON) whose
//! actions, guards, delays and child services are referenced by name and
//! resolved against an implementation bundle when the machine is compiled.
//! Resolving a transition is a pure function; running one is the
//! interpreter's job.
//!
//! # Core Concepts
//!
//! - **Machine**: a compiled, immutable definition with pure `transition`
//! - **Snapshot**: value, context, metadata and pending actions after a step
//! - **Interpreter**: runs a machine, owns its after-timers and children
//! - **Timers**: pausable, grouped under a coordinator with standby and wake
//!
//! # Example
//!
//! ```rust
//! use statecraft::builder::Implementations;
//! use statecraft::config::MachineConfig;
//! use statecraft::core::Properties;
//! use statecraft::interpreter::Interpreter;
//! use statecraft::machine::Machine;
//! use statecraft::timer::{ManualScheduler, TimerCoordinator};
//! use std::rc::Rc;
//!
//! let config = MachineConfig::from_json(r#"{
//!     "id": "ad",
//!     "initial": "loading",
//!     "context": {"plays": 0},
//!     "states": {
//!         "loading": {"on": {"LOADED": "playing"}},
//!         "playing": {
//!             "entry": "countPlay",
//!             "after": {"15000": "done"},
//!             "on": {"SKIP": {"target": "done", "cond": "skippable"}}
//!         },
//!         "done": {"type": "final"}
//!     }
//! }"#).unwrap();
//!
//! let implementations = Implementations::new()
//!     .assign_properties(
//!         "countPlay",
//!         Properties::new().compute("plays", |ctx, _, _| {
//!             (ctx["plays"].as_u64().unwrap_or(0) + 1).into()
//!         }),
//!     )
//!     .guard("skippable", |_, _, _| false);
//! let machine = Machine::compile(config, implementations).unwrap();
//!
//! let scheduler = Rc::new(ManualScheduler::new());
//! let ad = Interpreter::new(machine, TimerCoordinator::new(scheduler.clone()));
//! ad.start();
//! ad.send("LOADED").unwrap();
//! ad.send("SKIP").unwrap();
//! assert!(ad.state().matches("playing"));
//!
//! scheduler.advance_ms(15_000);
//! assert!(ad.state().matches("done"));
//! assert_eq!(ad.state().context["plays"], 1);
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod interpreter;
pub mod machine;
pub mod timer;

// Re-export commonly used types
pub use builder::{BuildError, Implementations, MachineBuilder, StateBuilder, TransitionBuilder};
pub use config::MachineConfig;
pub use core::{Action, Context, Event, Guard, Snapshot, StateValue};
pub use interpreter::{Interpreter, InterpreterStatus, MachineRegistry};
pub use machine::{Machine, MachineError};
pub use timer::{ManualScheduler, TimerCoordinator};
