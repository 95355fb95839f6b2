//! System parameters queried alongside the process record.

use psnap_core::{SnapError, SnapResult};
use std::io;
use std::mem;
use std::ptr;

/// Memory page size in bytes, from `sysconf(_SC_PAGESIZE)`.
pub fn page_size() -> u64 {
    // SAFETY: sysconf has no memory-safety preconditions
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as u64 }
}

/// Number of logical CPUs, from `sysctl { CTL_HW, HW_NCPU }`.
pub fn ncpu() -> SnapResult<usize> {
    let mut mib = [libc::CTL_HW, libc::HW_NCPU];
    let mut ncpu: libc::c_int = 0;
    let mut size = mem::size_of::<libc::c_int>();
    // SAFETY: the output buffer is a c_int and size names its exact length
    let rc = unsafe {
        libc::sysctl(
            mib.as_mut_ptr(),
            mib.len() as libc::c_uint,
            &mut ncpu as *mut libc::c_int as *mut libc::c_void,
            &mut size,
            ptr::null_mut(),
            0,
        )
    };
    if rc == -1 {
        return Err(SnapError::Lookup(format!(
            "sysctl hw.ncpu: {}",
            io::Error::last_os_error()
        )));
    }
    Ok(ncpu.max(1) as usize)
}
