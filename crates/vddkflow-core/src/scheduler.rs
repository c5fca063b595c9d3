//! Delayed task execution
//!
//! The lease release is modelled as data (a label, a delay and an action)
//! handed to a [`Scheduler`]. Production code uses [`TokioScheduler`];
//! tests drive time by hand with [`ManualScheduler`].

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;

type Action = Box<dyn FnOnce() + Send + 'static>;

/// A unit of work to run once after `delay`.
pub struct DelayedTask {
    label: &'static str,
    delay: Duration,
    action: Action,
}

impl DelayedTask {
    pub fn new(
        label: &'static str,
        delay: Duration,
        action: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            label,
            delay,
            action: Box::new(action),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Consume the task and run its action.
    pub fn run(self) {
        (self.action)()
    }
}

impl fmt::Debug for DelayedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayedTask")
            .field("label", &self.label)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

/// Runs submitted tasks once their delay has elapsed.
///
/// Submission never blocks and never fails; a task that is submitted is
/// run at most once.
pub trait Scheduler: Send + Sync {
    fn submit(&self, task: DelayedTask);
}

/// Scheduler backed by a tokio runtime.
///
/// Each task becomes a detached tokio task sleeping on `tokio::time`, so a
/// paused test clock (`start_paused = true`) controls it as well.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler on the runtime of the calling context.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    fn submit(&self, task: DelayedTask) {
        tracing::debug!(task = task.label(), delay = ?task.delay(), "scheduling delayed task");
        self.handle.spawn(async move {
            tokio::time::sleep(task.delay()).await;
            tracing::debug!(task = task.label(), "running delayed task");
            task.run();
        });
    }
}

/// Scheduler with a hand-driven clock.
///
/// Time only moves through [`ManualScheduler::advance`], which runs every
/// pending task whose deadline has been reached, earliest first.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    pending: Vec<(Duration, DelayedTask)>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks not yet run.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Remaining time until each pending task is due, in deadline order.
    pub fn pending_deadlines(&self) -> Vec<Duration> {
        let state = self.lock();
        let mut remaining: Vec<Duration> = state
            .pending
            .iter()
            .map(|(deadline, _)| deadline.saturating_sub(state.now))
            .collect();
        remaining.sort();
        remaining
    }

    /// Move the clock forward and run every task that became due.
    ///
    /// Returns the number of tasks run. Actions run without the internal
    /// lock held, so they may submit new tasks.
    pub fn advance(&self, by: Duration) -> usize {
        let mut due = {
            let mut state = self.lock();
            state.now += by;
            let now = state.now;
            let (due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending)
                .into_iter()
                .partition(|(deadline, _)| *deadline <= now);
            state.pending = rest;
            due
        };

        due.sort_by_key(|(deadline, _)| *deadline);
        let count = due.len();
        for (_, task) in due {
            task.run();
        }
        count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for ManualScheduler {
    fn submit(&self, task: DelayedTask) {
        let mut state = self.lock();
        let deadline = state.now + task.delay();
        state.pending.push((deadline, task));
    }
}
