//! Pipe file descriptor association: write a byte to the write end on
//! grant, drain pending bytes from the read end on revoke. `poll` first on
//! each side so a full or empty pipe never blocks the caller of
//! `grant`/`revoke` itself.

use std::os::unix::io::RawFd;
use std::sync::Arc;

use crate::error::{PermitError, PermitResult};
use crate::general::NonConsumingPermit;
use crate::hook::{HookKind, PermitHook};

struct GrantHook {
    fd: RawFd,
}

impl PermitHook for GrantHook {
    fn call(&self, _kind: HookKind) {
        unsafe {
            let mut pfd = libc::pollfd {
                fd: self.fd,
                events: libc::POLLOUT,
                revents: 0,
            };
            if libc::poll(&mut pfd, 1, 0) > 0 && pfd.revents & libc::POLLOUT != 0 {
                let byte: u8 = 1;
                libc::write(self.fd, &byte as *const u8 as *const libc::c_void, 1);
            }
        }
    }
}

struct RevokeHook {
    fd: RawFd,
}

impl PermitHook for RevokeHook {
    fn call(&self, _kind: HookKind) {
        unsafe {
            let mut buf = [0u8; 64];
            loop {
                let mut pfd = libc::pollfd {
                    fd: self.fd,
                    events: libc::POLLIN,
                    revents: 0,
                };
                if libc::poll(&mut pfd, 1, 0) <= 0 || pfd.revents & libc::POLLIN == 0 {
                    break;
                }
                let n = libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len());
                if n <= 0 {
                    break;
                }
            }
        }
    }
}

/// Mirrors a [`NonConsumingPermit`]'s grants onto a pipe: a granted permit
/// keeps the read end (`fds[0]`) readable until revoked, by writing to the
/// write end (`fds[1]`) on grant and draining `fds[0]` on revoke —
/// `pthread_permit_associate_fd`'s `ret->revoke.data=fds[0];
/// ret->grant.data=fds[1];` pairing.
pub struct FdAssociation {
    permit: Arc<NonConsumingPermit>,
    grant_hook: Arc<dyn PermitHook>,
    revoke_hook: Arc<dyn PermitHook>,
}

impl FdAssociation {
    /// `fds` is `[read_end, write_end]`, the same pair a caller would pass
    /// to `pipe(2)`: the grant hook writes to `fds[1]`, the revoke hook
    /// drains `fds[0]`.
    pub fn new(permit: Arc<NonConsumingPermit>, fds: [RawFd; 2]) -> PermitResult<Self> {
        if !permit.is_live() {
            return Err(PermitError::Invalid);
        }
        let [read_fd, write_fd] = fds;
        let grant_hook: Arc<dyn PermitHook> = Arc::new(GrantHook { fd: write_fd });
        let revoke_hook: Arc<dyn PermitHook> = Arc::new(RevokeHook { fd: read_fd });
        permit.push_hook(HookKind::Grant, grant_hook.clone());
        permit.push_hook(HookKind::Revoke, revoke_hook.clone());
        // If the permit is already granted, mirror that immediately rather
        // than waiting for the next grant to pick up the association.
        if permit.try_wait() {
            grant_hook.call(HookKind::Grant);
        }
        Ok(Self {
            permit,
            grant_hook,
            revoke_hook,
        })
    }
}

impl Drop for FdAssociation {
    fn drop(&mut self) {
        self.permit.remove_hook(HookKind::Grant, &self.grant_hook);
        self.permit.remove_hook(HookKind::Revoke, &self.revoke_hook);
    }
}
