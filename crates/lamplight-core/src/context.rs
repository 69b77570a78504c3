//! Stop signal for path searches that a newer request has made obsolete.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Handle to one search's stop flag.
///
/// The navigator creates a fresh context for every search it queues and
/// keeps a clone. Queuing the next search, or clearing the path, cancels
/// the kept clone. The search checks [`is_done`](Context::is_done) before
/// each node it expands and returns early once it is set. A cancelled
/// context never becomes live again.
#[derive(Clone, Debug)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the search holding this context should stop.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Tell the search holding any clone of this context to stop. Calling
    /// it again does nothing.
    #[inline]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
