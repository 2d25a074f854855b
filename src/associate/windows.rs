//! Windows signal associations. `WinHandleAssociation` mirrors a permit's
//! grants onto a pipe-like `HANDLE` via `WriteFile`/`ReadFile`, guarded by
//! `WaitForSingleObject` so a full/empty pipe never blocks the caller of
//! `grant`/`revoke`. `WinEventAssociation` mirrors onto a Windows event
//! object directly via `SetEvent`/`ResetEvent`.
//!
//! The original's public entry point for the event variant
//! (`pthread_permit_associate_winevent_np`) calls through to the handle
//! helper instead of the event one it defines right above it — the two are
//! kept genuinely distinct here instead of reproducing that mixup.

use std::sync::Arc;

use windows_sys::Win32::Foundation::HANDLE;
use windows_sys::Win32::Storage::FileSystem::{ReadFile, WriteFile};
use windows_sys::Win32::System::Threading::{ResetEvent, SetEvent, WaitForSingleObject};

use crate::error::{PermitError, PermitResult};
use crate::general::NonConsumingPermit;
use crate::hook::{HookKind, PermitHook};

/// Wraps a raw `HANDLE` to assert `Send + Sync`: the handle is only ever
/// used through the Win32 calls below, all of which are safe to call from
/// any thread.
struct RawHandle(HANDLE);
unsafe impl Send for RawHandle {}
unsafe impl Sync for RawHandle {}

struct HandleGrantHook {
    handle: RawHandle,
}

impl PermitHook for HandleGrantHook {
    fn call(&self, _kind: HookKind) {
        const WAIT_OBJECT_0: u32 = 0x00000000;
        unsafe {
            // Signaled already means a byte is still pending on the other
            // end; skip the write rather than filling the pipe further.
            if WaitForSingleObject(self.handle.0, 0) == WAIT_OBJECT_0 {
                return;
            }
            let byte: u8 = 1;
            let mut written = 0u32;
            WriteFile(
                self.handle.0,
                &byte as *const u8,
                1,
                &mut written,
                std::ptr::null_mut(),
            );
        }
    }
}

struct HandleRevokeHook {
    handle: RawHandle,
}

impl PermitHook for HandleRevokeHook {
    fn call(&self, _kind: HookKind) {
        const WAIT_OBJECT_0: u32 = 0x00000000;
        unsafe {
            let mut buf = [0u8; 64];
            loop {
                if WaitForSingleObject(self.handle.0, 0) != WAIT_OBJECT_0 {
                    break;
                }
                let mut read = 0u32;
                let ok = ReadFile(
                    self.handle.0,
                    buf.as_mut_ptr(),
                    buf.len() as u32,
                    &mut read,
                    std::ptr::null_mut(),
                );
                if ok == 0 || read == 0 {
                    break;
                }
            }
        }
    }
}

/// Mirrors grants onto a pipe-like `HANDLE`.
pub struct WinHandleAssociation {
    permit: Arc<NonConsumingPermit>,
    grant_hook: Arc<dyn PermitHook>,
    revoke_hook: Arc<dyn PermitHook>,
}

impl WinHandleAssociation {
    /// # Safety
    /// `handle` must be a valid, open handle for the lifetime of the
    /// association, and must not be used for anything else concurrently.
    pub unsafe fn new(permit: Arc<NonConsumingPermit>, handle: HANDLE) -> PermitResult<Self> {
        if !permit.is_live() {
            return Err(PermitError::Invalid);
        }
        let grant_hook: Arc<dyn PermitHook> = Arc::new(HandleGrantHook {
            handle: RawHandle(handle),
        });
        let revoke_hook: Arc<dyn PermitHook> = Arc::new(HandleRevokeHook {
            handle: RawHandle(handle),
        });
        permit.push_hook(HookKind::Grant, grant_hook.clone());
        permit.push_hook(HookKind::Revoke, revoke_hook.clone());
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

impl Drop for WinHandleAssociation {
    fn drop(&mut self) {
        self.permit.remove_hook(HookKind::Grant, &self.grant_hook);
        self.permit.remove_hook(HookKind::Revoke, &self.revoke_hook);
    }
}

struct EventGrantHook {
    handle: RawHandle,
}

impl PermitHook for EventGrantHook {
    fn call(&self, _kind: HookKind) {
        unsafe {
            SetEvent(self.handle.0);
        }
    }
}

struct EventRevokeHook {
    handle: RawHandle,
}

impl PermitHook for EventRevokeHook {
    fn call(&self, _kind: HookKind) {
        unsafe {
            ResetEvent(self.handle.0);
        }
    }
}

/// Mirrors grants onto a Windows event object via `SetEvent`/`ResetEvent`.
pub struct WinEventAssociation {
    permit: Arc<NonConsumingPermit>,
    grant_hook: Arc<dyn PermitHook>,
    revoke_hook: Arc<dyn PermitHook>,
}

impl WinEventAssociation {
    /// # Safety
    /// `handle` must be a valid event object handle for the lifetime of
    /// the association.
    pub unsafe fn new(permit: Arc<NonConsumingPermit>, handle: HANDLE) -> PermitResult<Self> {
        if !permit.is_live() {
            return Err(PermitError::Invalid);
        }
        let grant_hook: Arc<dyn PermitHook> = Arc::new(EventGrantHook {
            handle: RawHandle(handle),
        });
        let revoke_hook: Arc<dyn PermitHook> = Arc::new(EventRevokeHook {
            handle: RawHandle(handle),
        });
        permit.push_hook(HookKind::Grant, grant_hook.clone());
        permit.push_hook(HookKind::Revoke, revoke_hook.clone());
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

impl Drop for WinEventAssociation {
    fn drop(&mut self) {
        self.permit.remove_hook(HookKind::Grant, &self.grant_hook);
        self.permit.remove_hook(HookKind::Revoke, &self.revoke_hook);
    }
}
