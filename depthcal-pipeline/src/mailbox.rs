//! Single-slot exchange cell with latest-wins semantics.
//!
//! A `Mailbox` holds at most one item. `put` replaces whatever is there, so a
//! consumer that polls slower than its producer silently skips intermediate
//! items. That is the pipeline's backpressure: bounded latency over complete
//! delivery.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// Single-slot, mutex-guarded exchange cell.
///
/// Ownership moves through the box: `put` gives the item away and `take`
/// hands it to exactly one receiver. The lock only guards an `Option` swap.
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
    available: AtomicBool,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            available: AtomicBool::new(false),
        }
    }

    /// Store `item`, displacing any unread predecessor.
    ///
    /// The displaced item is returned so it is dropped outside the lock.
    pub fn put(&self, item: T) -> Option<T> {
        let mut slot = self.slot.lock();
        let displaced = slot.replace(item);
        self.available.store(true, Ordering::Release);
        displaced
    }

    /// Remove and return the stored item, if any.
    pub fn take(&self) -> Option<T> {
        let mut slot = self.slot.lock();
        let item = slot.take();
        self.available.store(false, Ordering::Release);
        item
    }

    /// Whether an unread item is waiting. Never consumes or locks.
    pub fn peek(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Discard any unread item.
    pub fn clear(&self) -> bool {
        self.take().is_some()
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
