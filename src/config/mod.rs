//! Serializable machine descriptors.
//!
//! Descriptors are plain data, usually delivered as JSON. Names in them
//! (actions, guards, delays, services) are resolved against an
//! [`Implementations`](crate::builder::Implementations) bundle when the
//! machine is compiled; inline closures can be attached from code.

mod invoke;
mod machine;
mod transition;

pub use invoke::{DataFn, InvokeConfig, InvokeData, InvokeReaction, InvokeSource, MachineFactory};
pub use machine::{MachineConfig, NodeKind, OneOrMany, StateNodeConfig};
pub use transition::TransitionConfig;
