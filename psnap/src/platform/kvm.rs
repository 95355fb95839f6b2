//! Scoped handle to the `libkvm` kernel-memory-access library.
//!
//! A `kvm_t` descriptor must be released deliberately: a close failure after
//! a successful lookup means the read cannot be trusted as one clean pass,
//! so [`KvmHandle::close`] surfaces it as an error instead of logging it.
//! The `Drop` impl only backstops the error paths.

use psnap_core::{SnapError, SnapResult};
use std::ptr;

/// Opaque `kvm_t` descriptor from `kvm.h`.
#[allow(non_camel_case_types)]
#[repr(C)]
pub struct kvm_t {
    _unused: [u8; 0],
}

#[link(name = "kvm")]
extern "C" {
    fn kvm_open(
        execfile: *const libc::c_char,
        corefile: *const libc::c_char,
        swapfile: *const libc::c_char,
        flags: libc::c_int,
        errstr: *const libc::c_char,
    ) -> *mut kvm_t;
    fn kvm_close(kd: *mut kvm_t) -> libc::c_int;
}

/// An open, read-only descriptor to the live kernel's memory image.
#[derive(Debug)]
pub struct KvmHandle {
    kd: *mut kvm_t,
}

impl KvmHandle {
    /// Opens the live kernel read-only.  `flags` is or'ed onto `O_RDONLY`.
    pub fn open(flags: libc::c_int) -> SnapResult<KvmHandle> {
        // "/dev/null" as the corefile selects the live kernel rather than a
        // crash dump; a non-null errstr makes libkvm prefix its own
        // diagnostics with the tool name
        const CORE: &[u8] = b"/dev/null\0";
        const ERRSTR: &[u8] = b"psnap\0";
        // SAFETY: both strings are nul-terminated and outlive the call
        let kd = unsafe {
            kvm_open(
                ptr::null(),
                CORE.as_ptr() as *const libc::c_char,
                ptr::null(),
                libc::O_RDONLY | flags,
                ERRSTR.as_ptr() as *const libc::c_char,
            )
        };
        if kd.is_null() {
            return Err(SnapError::Lookup("kvm_open failed".to_string()));
        }
        Ok(KvmHandle { kd })
    }

    pub fn raw(&self) -> *mut kvm_t {
        self.kd
    }

    /// Closes the descriptor, reporting a failed close as an error.
    pub fn close(self) -> SnapResult<()> {
        let kd = self.kd;
        std::mem::forget(self);
        // SAFETY: kd came from kvm_open and is closed exactly once
        if unsafe { kvm_close(kd) } != 0 {
            return Err(SnapError::Cleanup("kvm_close failed".to_string()));
        }
        Ok(())
    }
}

impl Drop for KvmHandle {
    fn drop(&mut self) {
        // SAFETY: kd is owned here and has not been closed
        unsafe {
            kvm_close(self.kd);
        }
    }
}
