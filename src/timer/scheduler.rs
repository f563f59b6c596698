//! Delay scheduling backends.
//!
//! Timers never sleep themselves: they ask a [`Scheduler`] to run a task once a
//! delay has elapsed and to cancel it again when paused or destroyed.
//!
//! - [`ManualScheduler`] keeps a virtual clock that only moves when
//!   [`ManualScheduler::advance`] is called. Tests and simulations use it.
//! - `TokioScheduler` (feature `tokio`) spawns local tasks on the current
//!   `LocalSet`.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Identifier of a task handed to a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// Runtime side of delayed execution.
///
/// All methods take `&self`: schedulers are shared between every timer of a
/// coordinator behind an `Rc`.
pub trait Scheduler {
    /// Monotonic time since the scheduler was created.
    fn now(&self) -> Duration;

    /// Run `task` once `delay` has elapsed.
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TaskId;

    /// Cancel a pending task. Returns `false` if it already ran or was cancelled.
    fn cancel(&self, id: TaskId) -> bool;
}

/// Deterministic scheduler driven by an explicit virtual clock.
///
/// # Example
///
/// ```rust
/// use statecraft::timer::{ManualScheduler, Scheduler};
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// let scheduler = ManualScheduler::new();
/// let fired = Rc::new(Cell::new(false));
/// let flag = Rc::clone(&fired);
/// scheduler.schedule(Duration::from_millis(50), Box::new(move || flag.set(true)));
///
/// scheduler.advance(Duration::from_millis(49));
/// assert!(!fired.get());
/// scheduler.advance(Duration::from_millis(1));
/// assert!(fired.get());
/// ```
#[derive(Default)]
pub struct ManualScheduler {
    state: RefCell<ManualState>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    queue: BTreeMap<(Duration, u64), Box<dyn FnOnce()>>,
    due: HashMap<u64, Duration>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward, running every task that falls due on the way.
    ///
    /// Tasks run in expiry order (ties in scheduling order) with the clock set
    /// to their due time. Tasks scheduled while advancing also run if they fall
    /// inside the window.
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                let due_key = match state.queue.first_key_value() {
                    Some((&key, _)) if key.0 <= target => key,
                    _ => break,
                };
                state.now = due_key.0;
                state.due.remove(&due_key.1);
                state.queue.remove(&due_key)
            };
            if let Some(task) = next {
                task();
            }
        }
        let mut state = self.state.borrow_mut();
        if state.now < target {
            state.now = target;
        }
    }

    /// Convenience wrapper around [`advance`](Self::advance) in milliseconds.
    pub fn advance_ms(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Duration {
        self.state.borrow().now
    }

    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TaskId {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now + delay;
        state.queue.insert((due, id), task);
        state.due.insert(id, due);
        TaskId(id)
    }

    fn cancel(&self, id: TaskId) -> bool {
        let removed = {
            let mut state = self.state.borrow_mut();
            match state.due.remove(&id.0) {
                Some(due) => state.queue.remove(&(due, id.0)),
                None => None,
            }
        };
        // The task is dropped outside the borrow: it may own timer state.
        removed.is_some()
    }
}

#[cfg(feature = "tokio")]
pub use tokio_backend::TokioScheduler;

#[cfg(feature = "tokio")]
mod tokio_backend {
    use super::{Scheduler, TaskId};
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tokio::time::Instant;

    /// Scheduler backed by `tokio::time::sleep` on local tasks.
    ///
    /// Must be used from within a `tokio::task::LocalSet`: timer callbacks are
    /// not `Send`.
    pub struct TokioScheduler {
        origin: Instant,
        next_id: Cell<u64>,
        handles: Rc<RefCell<HashMap<u64, JoinHandle<()>>>>,
    }

    impl TokioScheduler {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                next_id: Cell::new(0),
                handles: Rc::new(RefCell::new(HashMap::new())),
            }
        }
    }

    impl Default for TokioScheduler {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Scheduler for TokioScheduler {
        fn now(&self) -> Duration {
            self.origin.elapsed()
        }

        fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TaskId {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            let handles = Rc::downgrade(&self.handles);
            let handle = tokio::task::spawn_local(async move {
                tokio::time::sleep(delay).await;
                if let Some(handles) = handles.upgrade() {
                    handles.borrow_mut().remove(&id);
                }
                task();
            });
            self.handles.borrow_mut().insert(id, handle);
            TaskId(id)
        }

        fn cancel(&self, id: TaskId) -> bool {
            match self.handles.borrow_mut().remove(&id.0) {
                Some(handle) => {
                    handle.abort();
                    true
                }
                None => false,
            }
        }
    }
}
