//! Pausable, cancellable one-shot timer.

use super::error::TimerError;
use super::scheduler::{Scheduler, TaskId};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

/// Lifecycle of a [`Timer`].
///
/// `Idle → Running → {Paused, Fired, Destroyed}`, `Paused → Running`, and any
/// status may move to `Destroyed`. `Fired` and `Destroyed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Fired,
    Destroyed,
}

impl TimerStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Fired | Self::Destroyed)
    }
}

/// Outcome delivered on a timer's completion channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The full delay elapsed and the callback ran.
    Fired,
    /// The timer was destroyed before it could fire.
    Cancelled,
}

/// A one-shot delay that can be paused and resumed without losing progress.
///
/// Timers are cheap handles: cloning one yields another handle to the same
/// timer. They are normally created through
/// [`TimerCoordinator::new_timer`](super::TimerCoordinator::new_timer) so the
/// coordinator can pause, stash and destroy them as a group.
#[derive(Clone)]
pub struct Timer {
    inner: Rc<RefCell<TimerInner>>,
}

struct TimerInner {
    delay: Duration,
    remaining: Duration,
    elapsed: Duration,
    session_start: Option<Duration>,
    pending: Option<TaskId>,
    status: TimerStatus,
    callback: Option<Box<dyn FnOnce()>>,
    completion: Option<Sender<Completion>>,
    scheduler: Rc<dyn Scheduler>,
    paused: Rc<Cell<bool>>,
}

impl TimerInner {
    /// Fold the in-flight running session into `elapsed`, returning its length.
    fn fold_session(&mut self) -> Duration {
        match self.session_start.take() {
            Some(start) => {
                let session = self.scheduler.now().saturating_sub(start);
                self.elapsed += session;
                session
            }
            None => Duration::ZERO,
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel(id);
        }
    }
}

impl Timer {
    pub(crate) fn new(
        delay: Duration,
        scheduler: Rc<dyn Scheduler>,
        paused: Rc<Cell<bool>>,
        callback: Option<Box<dyn FnOnce()>>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TimerInner {
                delay,
                remaining: delay,
                elapsed: Duration::ZERO,
                session_start: None,
                pending: None,
                status: TimerStatus::Idle,
                callback,
                completion: None,
                scheduler,
                paused,
            })),
        }
    }

    /// Arm the timer for its remaining time.
    ///
    /// Returns `false` without doing anything when the owning coordinator is
    /// paused, when the timer is already running, or when it has fired or been
    /// destroyed.
    pub fn start(&self) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.paused.get() {
            return false;
        }
        match inner.status {
            TimerStatus::Running | TimerStatus::Fired | TimerStatus::Destroyed => return false,
            TimerStatus::Idle | TimerStatus::Paused => {}
        }

        let weak = Rc::downgrade(&self.inner);
        let task = Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                Timer { inner }.fire();
            }
        });
        let remaining = inner.remaining;
        let now = inner.scheduler.now();
        let id = inner.scheduler.schedule(remaining, task);
        inner.session_start = Some(now);
        inner.pending = Some(id);
        inner.status = TimerStatus::Running;
        true
    }

    /// Suspend a running timer, keeping the time it has already run.
    pub fn pause(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.status != TimerStatus::Running {
            return;
        }
        let session = inner.fold_session();
        inner.remaining = inner.remaining.saturating_sub(session);
        inner.cancel_pending();
        inner.status = TimerStatus::Paused;
    }

    /// Cancel the timer for good.
    ///
    /// An attached completion channel receives [`Completion::Cancelled`] unless
    /// the timer already fired.
    pub fn destroy(&self) {
        let completion = {
            let mut inner = self.inner.borrow_mut();
            if inner.status == TimerStatus::Destroyed {
                return;
            }
            inner.cancel_pending();
            inner.fold_session();
            inner.status = TimerStatus::Destroyed;
            inner.callback = None;
            inner.completion.take()
        };
        if let Some(tx) = completion {
            let _ = tx.send(Completion::Cancelled);
        }
    }

    /// Attach a completion channel and start the timer.
    ///
    /// The receiver yields exactly one [`Completion`]. Fails immediately when
    /// the timer can no longer fire.
    ///
    /// # Example
    ///
    /// ```rust
    /// use statecraft::timer::{Completion, ManualScheduler, TimerCoordinator};
    /// use std::rc::Rc;
    /// use std::time::Duration;
    ///
    /// let scheduler = Rc::new(ManualScheduler::new());
    /// let timers = TimerCoordinator::new(scheduler.clone());
    /// let timer = timers.new_timer(Duration::from_millis(100));
    ///
    /// let done = timer.completion().unwrap();
    /// scheduler.advance_ms(100);
    /// assert_eq!(done.try_recv(), Ok(Completion::Fired));
    /// ```
    pub fn completion(&self) -> Result<Receiver<Completion>, TimerError> {
        let rx = {
            let mut inner = self.inner.borrow_mut();
            match inner.status {
                TimerStatus::Destroyed => return Err(TimerError::Destroyed),
                TimerStatus::Fired => return Err(TimerError::AlreadyFired),
                _ => {}
            }
            let (tx, rx) = mpsc::channel();
            inner.completion = Some(tx);
            rx
        };
        self.start();
        Ok(rx)
    }

    /// Reset progress to zero and start again from the full delay.
    pub fn restart(&self) -> bool {
        self.pause();
        {
            let mut inner = self.inner.borrow_mut();
            if inner.status.is_terminal() {
                return false;
            }
            inner.elapsed = Duration::ZERO;
            inner.remaining = inner.delay;
        }
        self.start()
    }

    /// Time spent running, including the current session if running.
    pub fn elapsed(&self) -> Duration {
        let inner = self.inner.borrow();
        match inner.session_start {
            Some(start) => inner.elapsed + inner.scheduler.now().saturating_sub(start),
            None => inner.elapsed,
        }
    }

    pub fn delay(&self) -> Duration {
        self.inner.borrow().delay
    }

    /// Time left before the timer fires, as of the last pause.
    pub fn remaining(&self) -> Duration {
        self.inner.borrow().remaining
    }

    pub fn status(&self) -> TimerStatus {
        self.inner.borrow().status
    }

    pub fn is_running(&self) -> bool {
        self.status() == TimerStatus::Running
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    /// Whether two handles point at the same timer.
    pub fn ptr_eq(&self, other: &Timer) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn fire(&self) {
        let (callback, completion) = {
            let mut inner = self.inner.borrow_mut();
            if inner.status != TimerStatus::Running {
                return;
            }
            inner.pending = None;
            inner.fold_session();
            inner.remaining = Duration::ZERO;
            inner.status = TimerStatus::Fired;
            (inner.callback.take(), inner.completion.take())
        };
        if let Some(callback) = callback {
            callback();
        }
        if let Some(tx) = completion {
            let _ = tx.send(Completion::Fired);
        }
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Timer")
            .field("delay", &inner.delay)
            .field("remaining", &inner.remaining)
            .field("elapsed", &inner.elapsed)
            .field("status", &inner.status)
            .finish()
    }
}
