use std::time::Duration;

use super::Backoff;
use crate::models::Computation;

/// What the driver of a [`Poller`] should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The computation reached a terminal status.
    Done,
    /// Sleep for the given duration, then refresh the computation.
    Wait(Duration),
    /// The deadline passed before the computation finished.
    TimedOut,
}

/// Changes observed when feeding a refreshed snapshot to a [`Poller`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refresh {
    pub status_changed: bool,
    /// The newest warning of the snapshot, if any.
    pub warning: Option<String>,
}

/// Polling state of one computation.
///
/// The poller does not perform any IO or sleep on its own. The caller asks it
/// what to do with [`Poller::tick()`], performs the sleep and the refresh,
/// and hands the new snapshot back with [`Poller::refresh()`]. This keeps the
/// deadline and backoff logic independent of the runtime that drives it.
#[derive(Debug, Clone)]
pub struct Poller {
    snapshot: Computation,
    backoff: Backoff,
    deadline: Duration,
}

impl Poller {
    pub fn new(snapshot: Computation, backoff: Backoff, deadline: Duration) -> Self {
        Self {
            snapshot,
            backoff,
            deadline,
        }
    }

    /// Decide the next step, given the time elapsed since polling started.
    pub fn tick(&mut self, elapsed: Duration) -> Tick {
        if self.snapshot.is_done() {
            Tick::Done
        } else if elapsed > self.deadline {
            Tick::TimedOut
        } else {
            Tick::Wait(self.backoff.next_sleep())
        }
    }

    pub fn refresh(&mut self, snapshot: Computation) -> Refresh {
        let status_changed = snapshot.status != self.snapshot.status;
        let warning = snapshot.latest_warning().map(str::to_string);
        self.snapshot = snapshot;
        Refresh {
            status_changed,
            warning,
        }
    }

    /// The last known snapshot.
    pub fn snapshot(&self) -> &Computation {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> Computation {
        self.snapshot
    }
}
