//! Quiet-window deferral for expensive layout passes
//!
//! A run requested while the user is still scrolling is pushed back until a
//! full quiet window has passed since the last scroll event. Only one run is
//! ever pending: a new request supersedes (and cancels) the previous one.

use crate::cancel::CancellationToken;
use std::time::{Duration, Instant};

/// Outcome of asking for a run
#[derive(Debug, Clone)]
pub enum Readiness {
    /// No recent activity, run immediately
    RunNow,

    /// Run was scheduled for `due`; `token` is cancelled if it gets superseded
    Deferred {
        due: Instant,
        token: CancellationToken,
    },
}

#[derive(Debug)]
struct PendingRun {
    due: Instant,
    token: CancellationToken,
}

/// Single-slot deferred task driven by the host's clock
#[derive(Debug)]
pub struct DeferredTask {
    quiet_window: Duration,
    pending: Option<PendingRun>,
}

impl DeferredTask {
    /// Create a task that waits for `quiet_window` of inactivity
    pub fn new(quiet_window: Duration) -> Self {
        Self {
            quiet_window,
            pending: None,
        }
    }

    /// Length of the quiet window
    pub fn quiet_window(&self) -> Duration {
        self.quiet_window
    }

    /// Ask for a run at `now`, given the time of the last scroll event
    ///
    /// Any previously pending run is cancelled either way: it is replaced by a
    /// fresh deferred run, or made redundant by an immediate one.
    pub fn request(&mut self, now: Instant, last_activity: Option<Instant>) -> Readiness {
        self.cancel();

        let quiet = last_activity
            .map(|last| now.saturating_duration_since(last) >= self.quiet_window)
            .unwrap_or(true);
        if quiet {
            return Readiness::RunNow;
        }

        let due = now + self.quiet_window;
        let token = CancellationToken::new();
        log::trace!("deferring run by {:?}", self.quiet_window);
        self.pending = Some(PendingRun {
            due,
            token: token.clone(),
        });
        Readiness::Deferred { due, token }
    }

    /// Check the pending run at `now`
    ///
    /// Returns `true` when the caller should run the task now. A run that comes
    /// due while scrolling continues is rescheduled for another quiet window.
    pub fn poll(&mut self, now: Instant, last_activity: Option<Instant>) -> bool {
        let Some(pending) = &self.pending else {
            return false;
        };

        if pending.token.is_cancelled() {
            self.pending = None;
            return false;
        }
        if now < pending.due {
            return false;
        }

        self.pending = None;
        matches!(self.request(now, last_activity), Readiness::RunNow)
    }

    /// Cancel the pending run, returning whether one existed
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.token.cancel();
                log::debug!("cancelled pending run");
                true
            }
            None => false,
        }
    }

    /// Whether a run is waiting for its quiet window
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.token.is_cancelled())
    }

    /// When the pending run comes due, if any
    pub fn next_due(&self) -> Option<Instant> {
        self.pending
            .as_ref()
            .filter(|pending| !pending.token.is_cancelled())
            .map(|pending| pending.due)
    }
}

impl Drop for DeferredTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
