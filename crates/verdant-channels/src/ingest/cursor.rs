//! Offset cursor into the transport's update stream.

use std::sync::atomic::{AtomicI64, Ordering};

/// Next offset to request. Only ever moves forward.
#[derive(Debug, Default)]
pub struct UpdateCursor {
    next: AtomicI64,
}

impl UpdateCursor {
    pub fn new(start: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
        }
    }

    pub fn current(&self) -> i64 {
        self.next.load(Ordering::SeqCst)
    }

    /// Mark `update_id` as seen: `next = max(next, update_id + 1)`.
    /// Returns the offset after the update.
    pub fn advance(&self, update_id: i64) -> i64 {
        let candidate = update_id.saturating_add(1);
        let previous = self.next.fetch_max(candidate, Ordering::SeqCst);
        previous.max(candidate)
    }
}
