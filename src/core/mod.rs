//! Core statechart types.
//!
//! This module contains the pure data of the runtime:
//! - State values, context and metadata
//! - Events, actions and guards
//! - Snapshots produced by transitions
//! - Immutable transition history
//!
//! Nothing here owns timers or children; that is the interpreter's job.

mod action;
mod event;
mod guard;
mod history;
mod snapshot;
mod value;

pub use action::{Action, ActionFn, AssignFn, Assigner, Properties, PropertyFn};
pub use event::{Event, INIT_EVENT};
pub use guard::{Guard, GuardRef};
pub use history::{TransitionHistory, TransitionRecord};
pub use snapshot::{BoundAction, Snapshot};
pub use value::{Context, Meta, StateValue};
