//! Busy lease guarding build submission
//!
//! At most one submission holds the lease at a time. A denied attempt is
//! dropped, not queued. The lease is normally given back by a scheduled
//! release, since the build system offers no completion signal; every
//! acquisition carries a generation so that a timer left over from an
//! earlier cycle cannot clear a newer holder.

use crate::scheduler::{DelayedTask, Scheduler};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Proof of a successful acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseToken {
    generation: u64,
}

impl LeaseToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Process-wide single-flight admission flag.
///
/// One mutex covers both the check-and-set in [`BusyLease::try_acquire`]
/// and every release path.
#[derive(Debug, Default)]
pub struct BusyLease {
    state: Mutex<LeaseState>,
}

#[derive(Debug, Default)]
struct LeaseState {
    holder: Option<u64>,
    last_generation: u64,
}

impl BusyLease {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lease if it is idle. Never blocks on a held lease.
    pub fn try_acquire(&self) -> Option<LeaseToken> {
        let mut state = self.lock();
        if state.holder.is_some() {
            return None;
        }

        state.last_generation += 1;
        let generation = state.last_generation;
        state.holder = Some(generation);
        tracing::debug!(generation, "lease acquired");
        Some(LeaseToken { generation })
    }

    pub fn is_busy(&self) -> bool {
        self.lock().holder.is_some()
    }

    /// Clear the lease whoever holds it. Releasing an idle lease is a no-op.
    pub fn release(&self) {
        if let Some(generation) = self.lock().holder.take() {
            tracing::debug!(generation, "lease released");
        }
    }

    /// Clear the lease only if `token` is the current holder.
    ///
    /// Returns `false` when the lease is idle or held by a later
    /// acquisition.
    pub fn release_if(&self, token: LeaseToken) -> bool {
        let mut state = self.lock();
        if state.holder == Some(token.generation) {
            state.holder = None;
            true
        } else {
            false
        }
    }

    /// Arrange for `token` to be released once `after` has elapsed.
    pub fn schedule_release(
        self: &Arc<Self>,
        scheduler: &dyn Scheduler,
        after: Duration,
        token: LeaseToken,
    ) {
        let lease = Arc::clone(self);
        scheduler.submit(DelayedTask::new("lease-release", after, move || {
            if lease.release_if(token) {
                tracing::debug!(generation = token.generation, "lease expired");
            } else {
                tracing::debug!(
                    generation = token.generation,
                    "stale lease release ignored"
                );
            }
        }));
    }

    fn lock(&self) -> MutexGuard<'_, LeaseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
