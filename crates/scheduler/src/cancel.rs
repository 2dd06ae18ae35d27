//! Cancellation tokens for deferred runs
//!
//! Each scheduled run gets its own token. The host can hand a clone to whatever
//! timer fires the run and check it before doing any work, so a run that was
//! superseded or torn down never touches a detached layer.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared cancellation flag for one pending run
///
/// Clones observe the same flag. Cancellation is one-way: a cancelled run is
/// never revived, a new run gets a new token instead.
///
/// # Example
///
/// ```
/// use textlayer_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let timer_token = token.clone();
///
/// assert!(token.cancel());
/// assert!(timer_token.is_cancelled());
/// assert!(!token.cancel());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a live token
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the run
    ///
    /// Returns `true` if this call performed the cancellation, `false` if the
    /// token was already cancelled.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    /// Whether `cancel()` has been called on this token or any clone
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Whether two tokens refer to the same run
    pub fn same_run(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}
