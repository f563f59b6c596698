//! Timer pool with global pause and standby/wake stashing.

use super::scheduler::Scheduler;
use super::timer::Timer;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::trace;

/// Owns every live timer created through it.
///
/// The coordinator is the one shared mutable resource of the runtime: every
/// interpreter in a tree (parent and children) arms its after-timers through
/// the same coordinator, so pausing it freezes the whole tree.
///
/// # Example
///
/// ```rust
/// use statecraft::timer::{ManualScheduler, TimerCoordinator};
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// let scheduler = Rc::new(ManualScheduler::new());
/// let timers = TimerCoordinator::new(scheduler.clone());
///
/// let timer = timers.new_timer(Duration::from_millis(500));
/// timer.start();
///
/// timers.pause_all();
/// scheduler.advance_ms(1000);
/// assert!(!timer.is_finished());
///
/// timers.start_all();
/// scheduler.advance_ms(500);
/// assert!(timer.is_finished());
/// ```
#[derive(Clone)]
pub struct TimerCoordinator {
    inner: Rc<CoordinatorInner>,
}

struct CoordinatorInner {
    scheduler: Rc<dyn Scheduler>,
    paused: Rc<Cell<bool>>,
    timers: RefCell<Vec<Timer>>,
    stash: RefCell<Vec<Timer>>,
}

impl TimerCoordinator {
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            inner: Rc::new(CoordinatorInner {
                scheduler,
                paused: Rc::new(Cell::new(false)),
                timers: RefCell::new(Vec::new()),
                stash: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Create an idle timer without a callback.
    pub fn new_timer(&self, delay: Duration) -> Timer {
        self.register(delay, None)
    }

    /// Create an idle timer that runs `callback` when it fires.
    pub fn new_timer_with<F>(&self, delay: Duration, callback: F) -> Timer
    where
        F: FnOnce() + 'static,
    {
        self.register(delay, Some(Box::new(callback)))
    }

    fn register(&self, delay: Duration, callback: Option<Box<dyn FnOnce()>>) -> Timer {
        let timer = Timer::new(
            delay,
            Rc::clone(&self.inner.scheduler),
            Rc::clone(&self.inner.paused),
            callback,
        );
        let mut timers = self.inner.timers.borrow_mut();
        timers.retain(|t| !t.is_finished());
        timers.push(timer.clone());
        timer
    }

    /// Pause every owned timer and refuse to start new ones until
    /// [`start_all`](Self::start_all).
    pub fn pause_all(&self) {
        self.inner.paused.set(true);
        for timer in self.snapshot() {
            timer.pause();
        }
        trace!("paused all timers");
    }

    /// Clear the global pause and start every owned timer.
    pub fn start_all(&self) {
        self.inner.paused.set(false);
        for timer in self.snapshot() {
            timer.start();
        }
        trace!("started all timers");
    }

    /// Pause every running timer and remember it for [`wake`](Self::wake).
    ///
    /// Does nothing while a previous standby is still stashed. Timers that are
    /// not running (never started, paused, finished) are left alone.
    pub fn standby(&self) {
        self.inner.stash.borrow_mut().retain(|t| !t.is_finished());
        if self.in_standby() {
            return;
        }
        let running: Vec<Timer> = self
            .snapshot()
            .into_iter()
            .filter(Timer::is_running)
            .collect();
        for timer in &running {
            timer.pause();
        }
        trace!(count = running.len(), "timers on standby");
        self.inner.stash.borrow_mut().extend(running);
    }

    /// Whether stashed timers that can still fire wait for [`wake`](Self::wake).
    pub fn in_standby(&self) -> bool {
        self.stashed() > 0
    }

    /// Restart stashed timers, most recently stashed first, until the stash is empty.
    pub fn wake(&self) {
        loop {
            let next = self.inner.stash.borrow_mut().pop();
            let Some(timer) = next else {
                break;
            };
            timer.start();
        }
    }

    /// Destroy every owned timer and forget them.
    pub fn destroy_all(&self) {
        let timers = std::mem::take(&mut *self.inner.timers.borrow_mut());
        self.inner.stash.borrow_mut().clear();
        for timer in timers {
            timer.destroy();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.get()
    }

    /// Number of owned timers that have neither fired nor been destroyed.
    pub fn live_timers(&self) -> usize {
        self.inner
            .timers
            .borrow()
            .iter()
            .filter(|t| !t.is_finished())
            .count()
    }

    /// Number of stashed timers that can still fire.
    pub fn stashed(&self) -> usize {
        self.inner
            .stash
            .borrow()
            .iter()
            .filter(|t| !t.is_finished())
            .count()
    }

    pub fn scheduler(&self) -> Rc<dyn Scheduler> {
        Rc::clone(&self.inner.scheduler)
    }

    fn snapshot(&self) -> Vec<Timer> {
        self.inner.timers.borrow().clone()
    }
}

impl fmt::Debug for TimerCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerCoordinator")
            .field("paused", &self.is_paused())
            .field("live_timers", &self.live_timers())
            .field("stashed", &self.stashed())
            .finish()
    }
}
