//! Shared atomic bookkeeping used by both the simple and general engines.
//!
//! Every permit tracks two independent in-progress/completed pairs: one for
//! waiters (`waiters`/`waited`), one for granters (`granters`/`granted`) on
//! the general engine. `entered == exited` means no operation of that kind
//! is in flight; `entered > exited` bounds how many are. `Epoch` captures
//! that pair once so callers never duplicate the ordering rules.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct Epoch {
    entered: AtomicU64,
    exited: AtomicU64,
}

impl Epoch {
    pub const fn new() -> Self {
        Self {
            entered: AtomicU64::new(0),
            exited: AtomicU64::new(0),
        }
    }

    /// Record entry into the operation. Acquire so a subsequent liveness
    /// check (the magic tag) cannot be reordered before this is visible.
    pub fn enter(&self) {
        self.entered.fetch_add(1, Ordering::Acquire);
    }

    /// Record completion. Relaxed: nothing downstream depends on the store
    /// being ordered with respect to anything but itself.
    pub fn exit(&self) {
        self.exited.fetch_add(1, Ordering::Relaxed);
    }

    /// True while at least one entry has not yet exited.
    pub fn in_progress(&self) -> bool {
        self.entered.load(Ordering::Acquire) != self.exited.load(Ordering::Acquire)
    }
}
