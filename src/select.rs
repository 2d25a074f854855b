//! The select operator: wait on several general-engine permits at once and
//! atomically claim exactly one.
//!
//! The original keeps a fixed, process-wide table of `MAX_SELECTS` session
//! records (`pthread_permit_selects`) so a select call never allocates: it
//! claims a free slot, has every participating permit point at it, blocks
//! on the slot's own condition variable, then releases the slot. The same
//! shape is kept here as a `static` array, const-initialized with
//! `parking_lot` primitives so no lazy-init wrapper is needed.

use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::error::{PermitError, PermitResult};
use crate::general::PermitEngine;

/// Size of the process-wide select session table, preserved from the
/// original's `MAX_PTHREAD_PERMIT_SELECTS`.
pub const MAX_SELECTS: usize = 64;

pub(crate) struct SelectSlot {
    claimed: AtomicBool,
    mtx: Mutex<()>,
    cond: Condvar,
}

impl SelectSlot {
    const fn new() -> Self {
        Self {
            claimed: AtomicBool::new(false),
            mtx: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    fn try_claim_slot(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn release_slot(&self) {
        self.claimed.store(false, Ordering::Release);
    }

    pub(crate) fn notify_all(&self) {
        self.cond.notify_all();
    }
}

static SESSIONS: [SelectSlot; MAX_SELECTS] = {
    const SLOT: SelectSlot = SelectSlot::new();
    [SLOT; MAX_SELECTS]
};

fn claim_session() -> Option<&'static SelectSlot> {
    SESSIONS.iter().find(|slot| slot.try_claim_slot())
}

/// Per-permit table entry: either empty or pointing at the session
/// currently watching this permit through this slot. `AtomicPtr` stores a
/// `'static` reference to one of the [`SESSIONS`] rows.
pub(crate) type SelectLink = AtomicPtr<SelectSlot>;

pub(crate) const EMPTY_LINK: SelectLink = AtomicPtr::new(std::ptr::null_mut());

pub(crate) fn signal_links(links: &[SelectLink; MAX_SELECTS]) {
    for link in links {
        let ptr = link.load(Ordering::Acquire);
        if !ptr.is_null() {
            unsafe { &*ptr }.notify_all();
        }
    }
}

/// One slot in a [`select`] call: a permit to watch, or an entry the last
/// `select` call already zeroed out because it lost.
pub enum SelectTarget<'a> {
    Consuming(&'a PermitEngine<false>),
    NonConsuming(&'a PermitEngine<true>),
    Empty,
}

impl<'a> SelectTarget<'a> {
    fn is_live(&self) -> bool {
        match self {
            SelectTarget::Consuming(p) => p.is_live(),
            SelectTarget::NonConsuming(p) => p.is_live(),
            SelectTarget::Empty => false,
        }
    }

    fn try_claim(&self) -> bool {
        match self {
            SelectTarget::Consuming(p) => p.try_claim_for_select(),
            SelectTarget::NonConsuming(p) => p.try_claim_for_select(),
            SelectTarget::Empty => false,
        }
    }

    /// Spins while a non-consuming grant currently holds `lock_wake`, the
    /// same guard a direct `wait` observes (`PermitEngine::spin_while_locked`),
    /// so a selector cannot register mid-grant and escape that grant's
    /// "every waiter present is released" guarantee. A no-op for a
    /// consuming target, which has no `lock_wake` to spin on.
    fn spin_while_locked(&self) {
        match self {
            SelectTarget::Consuming(p) => p.spin_while_locked(),
            SelectTarget::NonConsuming(p) => p.spin_while_locked(),
            SelectTarget::Empty => {}
        }
    }

    fn enter_wait(&self) {
        match self {
            SelectTarget::Consuming(p) => p.enter_select_wait(),
            SelectTarget::NonConsuming(p) => p.enter_select_wait(),
            SelectTarget::Empty => {}
        }
    }

    fn exit_wait(&self) {
        match self {
            SelectTarget::Consuming(p) => p.exit_select_wait(),
            SelectTarget::NonConsuming(p) => p.exit_select_wait(),
            SelectTarget::Empty => {}
        }
    }

    fn link(&self, slot: &'static SelectSlot) -> Option<usize> {
        match self {
            SelectTarget::Consuming(p) => p.link_select(slot),
            SelectTarget::NonConsuming(p) => p.link_select(slot),
            SelectTarget::Empty => None,
        }
    }

    fn unlink(&self, idx: usize) {
        match self {
            SelectTarget::Consuming(p) => p.unlink_select(idx),
            SelectTarget::NonConsuming(p) => p.unlink_select(idx),
            SelectTarget::Empty => {}
        }
    }
}

/// Waits on every live permit in `targets` and atomically claims exactly
/// one. On success, every entry except the winner is replaced with
/// [`SelectTarget::Empty`] and `Ok(Some(winner))` is returned. Entries that
/// were already `Empty`, or whose permit has been closed, are skipped
/// without error (matching the original, which silently drops invalid
/// entries from consideration rather than reporting per-entry errors).
///
/// If every entry is already `Empty` or dead, this returns `Ok(None)`
/// immediately rather than an error — per §4.3 step 1 ("if zero, return
/// success immediately"), matching the original's
/// `if (!totalpermits) return thrd_success;`. This lets a caller fold an
/// all-null array through `select` as a no-op rather than special-casing it.
pub fn select(
    targets: &mut [SelectTarget<'_>],
    deadline: Option<Instant>,
) -> PermitResult<Option<usize>> {
    let live_count = targets.iter().filter(|t| t.is_live()).count();
    if live_count == 0 {
        return Ok(None);
    }

    // Fast path: maybe one is already grantable without registering at all.
    if let Some(winner) = try_claim_any(targets) {
        zero_losers(targets, winner);
        return Ok(Some(winner));
    }

    let slot = claim_session().ok_or(PermitError::NoMem)?;
    for target in targets.iter() {
        target.spin_while_locked();
        target.enter_wait();
    }
    let links: Vec<Option<usize>> = targets.iter().map(|t| t.link(slot)).collect();

    let result = {
        let mut guard = slot.mtx.lock();
        loop {
            if let Some(winner) = try_claim_any(targets) {
                break Ok(winner);
            }
            if !park(&slot.cond, &mut guard, deadline) {
                if let Some(winner) = try_claim_any(targets) {
                    break Ok(winner);
                }
                break Err(PermitError::Timeout);
            }
        }
    };

    for (target, link) in targets.iter().zip(links.iter()) {
        if let Some(idx) = link {
            target.unlink(*idx);
        }
        target.exit_wait();
    }
    slot.release_slot();

    if let Ok(winner) = &result {
        zero_losers(targets, *winner);
    }
    result.map(Some)
}

fn try_claim_any(targets: &[SelectTarget<'_>]) -> Option<usize> {
    targets
        .iter()
        .position(|t| t.is_live() && t.try_claim())
}

fn zero_losers(targets: &mut [SelectTarget<'_>], winner: usize) {
    for (i, target) in targets.iter_mut().enumerate() {
        if i != winner {
            *target = SelectTarget::Empty;
        }
    }
}

fn park(cond: &Condvar, guard: &mut MutexGuard<'_, ()>, deadline: Option<Instant>) -> bool {
    match deadline {
        None => {
            cond.wait(guard);
            true
        }
        Some(deadline) => {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            !cond.wait_for(guard, deadline - now).timed_out()
        }
    }
}
