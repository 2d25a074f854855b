//! Thread permits: a one-bit synchronization primitive for handing
//! permission from one thread to another.
//!
//! A permit is neither a semaphore (no count), a condition variable (no
//! predicate to re-check against arbitrary shared state), nor an event (no
//! hook chain, no select). It is closer to a single-shot gate that can be
//! re-armed: [`grant`](SimplePermit::grant) sets it, [`wait`](SimplePermit::wait)
//! blocks until it is set, and — depending on the variant — either the
//! first waiter to observe a grant consumes it, or every waiter does.
//!
//! # Variants
//!
//! - [`SimplePermit`] — the fast path: consuming, no hooks, no select.
//! - [`Permit`] (= `PermitEngine<false>`) — consuming, hookable,
//!   select-capable.
//! - [`NonConsumingPermit`] (= `PermitEngine<true>`) — left granted for
//!   every waiter until revoked; hookable, select-capable, and the only
//!   variant that supports [`associate`] (mirroring its state onto an OS
//!   signaling object).
//!
//! # Example
//!
//! ```
//! use permit_sync::SimplePermit;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let permit = Arc::new(SimplePermit::new(false));
//! let waiter = {
//!     let permit = permit.clone();
//!     thread::spawn(move || permit.wait().unwrap())
//! };
//! permit.grant().unwrap();
//! waiter.join().unwrap();
//! ```

mod counter;
mod error;
mod general;
mod grant;
mod hook;
mod select;
mod simple;
mod spinlock;
mod waitloop;

pub mod associate;

pub use error::{PermitError, PermitResult};
pub use general::{NonConsumingPermit, Permit, PermitEngine};
pub use grant::Grantable;
pub use hook::{HookKind, PermitHook};
pub use select::{select, SelectTarget, MAX_SELECTS};
pub use simple::SimplePermit;
