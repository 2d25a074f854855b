//! The blocking loop shared by every `wait`/`timedwait` entry point.
//!
//! `parking_lot::Condvar` is not tied to a particular mutex the way a POSIX
//! `cnd_t` is, so there is no need for the internal-mutex hand-off the
//! original C implementation performs around an externally supplied lock:
//! a caller's `MutexGuard` can simply be unlocked for the duration of the
//! block via `MutexGuard::unlocked` and relocked on the way out.

use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};

pub(crate) struct WaitGate {
    mtx: Mutex<()>,
    cond: Condvar,
}

impl WaitGate {
    pub const fn new() -> Self {
        Self {
            mtx: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    /// Block until `try_claim` succeeds or `deadline` passes. `try_claim` is
    /// re-run after every wake, including spurious ones. A `None` deadline
    /// blocks indefinitely.
    pub fn block(&self, mut try_claim: impl FnMut() -> bool, deadline: Option<Instant>) -> bool {
        let mut guard = self.mtx.lock();
        loop {
            if try_claim() {
                return true;
            }
            if !self.park(&mut guard, deadline) {
                return try_claim();
            }
        }
    }

    /// As [`Self::block`], but additionally releases the caller's own lock
    /// for the duration of each park, honoring the "atomically releases the
    /// supplied mutex while waiting" contract external-mutex callers expect.
    pub fn block_with<T>(
        &self,
        ext: &mut MutexGuard<'_, T>,
        mut try_claim: impl FnMut() -> bool,
        deadline: Option<Instant>,
    ) -> bool {
        let mut guard = self.mtx.lock();
        loop {
            if try_claim() {
                return true;
            }
            let parked = MutexGuard::unlocked(ext, || self.park(&mut guard, deadline));
            if !parked {
                return try_claim();
            }
        }
    }

    /// Parks once. Returns `false` if the deadline has passed (caller
    /// should make one final `try_claim` and give up), `true` otherwise.
    fn park(&self, guard: &mut MutexGuard<'_, ()>, deadline: Option<Instant>) -> bool {
        match deadline {
            None => {
                self.cond.wait(guard);
                true
            }
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return false;
                }
                !self.cond.wait_for(guard, deadline - now).timed_out()
            }
        }
    }

    pub fn notify_one(&self) {
        self.cond.notify_one();
    }

    pub fn notify_all(&self) {
        self.cond.notify_all();
    }
}
