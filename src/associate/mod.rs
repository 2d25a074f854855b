//! External signal associations: mirroring a non-consuming permit's state
//! onto an OS-level signaling object (a pipe file descriptor on Unix, a
//! `HANDLE` or event object on Windows) so a third party that only knows
//! how to poll/wait on that object sees the permit's grants and revokes.
//!
//! Only the non-consuming permit supports associations, same as the
//! original (`pthread_permitnc_associate_*`): a consuming permit's grant
//! is claimed by exactly one waiter, which makes "mirror the state
//! somewhere else" meaningless — there would be nothing left to mirror by
//! the time a second observer looked.
//!
//! Each association is an RAII handle: dropping it unregisters the hook
//! pair, replacing the original's explicit `pthread_permit_deassociate`
//! call.

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::FdAssociation;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::{WinEventAssociation, WinHandleAssociation};
