//! Text Layer Scheduler Library
//!
//! Deferred-task policy with cooperative cancellation.
//!
//! The text layer's render-alignment pass is expensive on large pages, so it is
//! held back while the viewport is scrolling. This crate models that policy
//! without owning a timer: the host reports the current time and the last
//! scroll time, and polls the task from its own event loop.
//!
//! # Example
//!
//! ```
//! use std::time::{Duration, Instant};
//! use textlayer_scheduler::{DeferredTask, Readiness};
//!
//! let mut task = DeferredTask::new(Duration::from_millis(200));
//! let now = Instant::now();
//!
//! // The user scrolled 50ms ago, so the run is pushed back
//! let last_scroll = now - Duration::from_millis(50);
//! assert!(matches!(task.request(now, Some(last_scroll)), Readiness::Deferred { .. }));
//!
//! // Once the quiet window has passed, polling reports the run as due
//! let later = now + Duration::from_millis(250);
//! assert!(task.poll(later, Some(last_scroll)));
//! ```

mod cancel;
mod deferred;

pub use cancel::CancellationToken;
pub use deferred::{DeferredTask, Readiness};
