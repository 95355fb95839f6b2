//! Lookup through `sysctl(2)`.
//!
//! One parameterized call fills a caller-provided `kinfo_proc`.  The kernel
//! reports how many bytes it wrote; anything other than exactly one record
//! is fatal.

use psnap_core::tables::openbsd as tables;
use psnap_core::{label, ProcessSnapshot, SchedInfo, SnapError, SnapResult};

use super::params;
use std::io;
use std::mem;
use std::ptr;

/// `p_cpuid` value for "not on any cpu" (`KI_NOCPU` in `sys/sysctl.h`).
const KI_NOCPU: u64 = u64::MAX;

pub fn snapshot(pid: i32) -> SnapResult<ProcessSnapshot> {
    let mut kip = mem::MaybeUninit::<libc::kinfo_proc>::uninit();
    let mut size = mem::size_of::<libc::kinfo_proc>();
    let mut mib = [
        libc::CTL_KERN,
        libc::KERN_PROC,
        libc::KERN_PROC_PID,
        pid,
        size as libc::c_int,
        1,
    ];

    // SAFETY: the buffer holds exactly one record and size names its length;
    // the kernel writes at most that much
    let rc = unsafe {
        libc::sysctl(
            mib.as_mut_ptr(),
            mib.len() as libc::c_uint,
            kip.as_mut_ptr() as *mut libc::c_void,
            &mut size,
            ptr::null_mut(),
            0,
        )
    };
    if rc == -1 {
        let err = io::Error::last_os_error();
        return Err(match err.raw_os_error() {
            Some(libc::ESRCH) => SnapError::NoRecord { pid, count: 0 },
            Some(libc::EPERM) | Some(libc::EACCES) => SnapError::PermissionDenied(None),
            _ => SnapError::Lookup(format!("sysctl kern.proc.pid: {}", err)),
        });
    }
    let count = size / mem::size_of::<libc::kinfo_proc>();
    if count != 1 {
        return Err(SnapError::NoRecord { pid, count });
    }
    // SAFETY: the kernel reported one fully-written record
    let kip = unsafe { kip.assume_init() };

    let cpu_count = params::ncpu()?;

    let mut sched = SchedInfo::new(u32::from(kip.p_stat as u8));
    sched.wait_channel = super::cstr_field(&kip.p_wmesg);
    if kip.p_cpuid != KI_NOCPU {
        sched.cpu = Some(kip.p_cpuid as u32);
    }
    let state_label = label::render_label(&tables::POLICY, &sched, cpu_count);

    Ok(ProcessSnapshot {
        pid,
        resident_pages: kip.p_vm_rssize as u64,
        page_size: params::page_size(),
        start_time: kip.p_ustart_sec as i64,
        state_code: sched.state_code,
        state_label,
        cpu_count,
    })
}
