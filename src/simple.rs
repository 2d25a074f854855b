//! The simple consuming permit: no hooks, no select, the fast path.
//!
//! Grant sets a single flag and wakes everyone blocked on it; the first
//! waiter to win the CAS consumes the flag back to unset. No hook chain,
//! no select-session bookkeeping, no `lock_wake` — the full general engine
//! in [`crate::general`] is the one to reach for when any of those are
//! needed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::MutexGuard;

use crate::counter::Epoch;
use crate::error::{PermitError, PermitResult};
use crate::grant::Grantable;
use crate::waitloop::WaitGate;

pub struct SimplePermit {
    live: AtomicBool,
    permit: AtomicBool,
    waiters: Epoch,
    gate: WaitGate,
}

impl SimplePermit {
    /// Rust's ownership model rules out the original's "busy" re-init error:
    /// a fresh `SimplePermit` is always a fresh allocation, never a live
    /// object being stomped in place.
    pub fn new(initial: bool) -> Self {
        Self {
            live: AtomicBool::new(true),
            permit: AtomicBool::new(initial),
            waiters: Epoch::new(),
            gate: WaitGate::new(),
        }
    }

    /// Grants the permit, waking any waiter.
    ///
    /// Setting the flag and firing a single notify is not enough: a waiter
    /// can observe the flag still unset, and the notify can land in the gap
    /// before that same waiter parks on the condvar, losing the wakeup. So
    /// this keeps re-storing the flag and re-notifying in a bounded spin
    /// until either a waiter has claimed it (flag back to unset) or every
    /// waiter present when grant started has left (a racing `wait_for` can
    /// give up on its own timeout, which must not wedge the granter here
    /// forever).
    pub fn grant(&self) -> PermitResult<()> {
        if !self.live.load(Ordering::Acquire) {
            return Err(PermitError::Invalid);
        }
        self.permit.store(true, Ordering::Release);
        while self.live.load(Ordering::Acquire)
            && self.permit.load(Ordering::Acquire)
            && self.waiters.in_progress()
        {
            self.gate.notify_one();
            std::thread::yield_now();
        }
        Ok(())
    }

    /// Revokes the permit without waking anyone.
    pub fn revoke(&self) {
        self.permit.store(false, Ordering::Relaxed);
    }

    fn try_claim(&self) -> bool {
        self.permit
            .compare_exchange(true, false, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Blocks until granted. Returns `Err(Invalid)` if the permit is closed,
    /// either before the wait starts or while it is blocked.
    pub fn wait(&self) -> PermitResult<()> {
        self.wait_until_opt(None)
    }

    pub fn wait_for(&self, timeout: Duration) -> PermitResult<()> {
        self.wait_until_opt(Some(Instant::now() + timeout))
    }

    pub fn wait_until(&self, deadline: Instant) -> PermitResult<()> {
        self.wait_until_opt(Some(deadline))
    }

    fn wait_until_opt(&self, deadline: Option<Instant>) -> PermitResult<()> {
        if !self.live.load(Ordering::Acquire) {
            return Err(PermitError::Invalid);
        }
        self.waiters.enter();
        if !self.live.load(Ordering::Acquire) {
            self.waiters.exit();
            return Err(PermitError::Invalid);
        }
        let stopped = self
            .gate
            .block(|| !self.live.load(Ordering::Acquire) || self.try_claim(), deadline);
        let live = self.live.load(Ordering::Acquire);
        self.waiters.exit();
        if !live {
            Err(PermitError::Invalid)
        } else if stopped {
            Ok(())
        } else {
            Err(PermitError::Timeout)
        }
    }

    /// As [`Self::wait`], but releases `guard`'s mutex for the duration of
    /// the block, matching the original's optional external-mutex argument.
    pub fn wait_with<T>(&self, guard: &mut MutexGuard<'_, T>) -> PermitResult<()> {
        self.wait_with_opt(guard, None)
    }

    pub fn wait_for_with<T>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        timeout: Duration,
    ) -> PermitResult<()> {
        self.wait_with_opt(guard, Some(Instant::now() + timeout))
    }

    pub fn wait_until_with<T>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        deadline: Instant,
    ) -> PermitResult<()> {
        self.wait_with_opt(guard, Some(deadline))
    }

    fn wait_with_opt<T>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        deadline: Option<Instant>,
    ) -> PermitResult<()> {
        if !self.live.load(Ordering::Acquire) {
            return Err(PermitError::Invalid);
        }
        self.waiters.enter();
        if !self.live.load(Ordering::Acquire) {
            self.waiters.exit();
            return Err(PermitError::Invalid);
        }
        let stopped = self.gate.block_with(
            guard,
            || !self.live.load(Ordering::Acquire) || self.try_claim(),
            deadline,
        );
        let live = self.live.load(Ordering::Acquire);
        self.waiters.exit();
        if !live {
            Err(PermitError::Invalid)
        } else if stopped {
            Ok(())
        } else {
            Err(PermitError::Timeout)
        }
    }

    /// Non-blocking single attempt.
    pub fn try_wait(&self) -> bool {
        self.live.load(Ordering::Acquire) && self.try_claim()
    }

    /// Closes the permit: wakes every blocked waiter with an error and
    /// marks the permit dead. Safe to call while other threads are
    /// concurrently waiting or granting; calling `close` concurrently with
    /// another `close` on the same permit is not, matching the original
    /// (whose destroy is explicitly non-reentrant).
    pub fn close(&self) {
        self.live.store(false, Ordering::SeqCst);
        while self.waiters.in_progress() {
            self.permit.store(true, Ordering::Release);
            self.gate.notify_all();
        }
    }
}

impl Grantable for SimplePermit {
    fn grant(&self) -> PermitResult<()> {
        self.grant()
    }
}

impl Drop for SimplePermit {
    fn drop(&mut self) {
        self.close();
    }
}
