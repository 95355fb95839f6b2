//! Lookup through `libkvm`'s `kvm_getproc2`.
//!
//! The handle is opened with `KVM_NO_FILES`, which answers the query from
//! the live kernel without touching any kernel memory files, and is closed
//! before the snapshot is built; a failed close is fatal.

use psnap_core::tables::netbsd as tables;
use psnap_core::{label, ProcessSnapshot, SchedInfo, SnapError, SnapResult};

use super::kvm::{kvm_t, KvmHandle};
use super::params;
use std::mem;
use std::ptr;

/// `kvm_open` flag from `kvm.h`: no file access at all.
const KVM_NO_FILES: libc::c_int = 0x80000000u32 as libc::c_int;

/// `p_cpuid` value for "not on any cpu" (`KI_NOCPU` in `sys/sysctl.h`).
const KI_NOCPU: u64 = u64::MAX;

#[link(name = "kvm")]
extern "C" {
    fn kvm_getproc2(
        kd: *mut kvm_t,
        op: libc::c_int,
        arg: libc::c_int,
        elemsize: libc::size_t,
        cnt: *mut libc::c_int,
    ) -> *mut libc::kinfo_proc2;
}

pub fn snapshot(pid: i32) -> SnapResult<ProcessSnapshot> {
    let kvm = KvmHandle::open(KVM_NO_FILES)?;

    let mut cnt: libc::c_int = 0;
    // SAFETY: kd is a live descriptor; the records belong to libkvm and are
    // copied out below, before the handle is closed
    let kip = unsafe {
        kvm_getproc2(
            kvm.raw(),
            libc::KERN_PROC_PID,
            pid,
            mem::size_of::<libc::kinfo_proc2>(),
            &mut cnt,
        )
    };
    if kip.is_null() || cnt != 1 {
        let count = if kip.is_null() { 0 } else { cnt.max(0) as usize };
        // best-effort close on the error path
        let _ = kvm.close();
        return Err(SnapError::NoRecord { pid, count });
    }
    // SAFETY: cnt == 1, so kip points at one valid record
    let kip = unsafe { ptr::read(kip) };

    kvm.close()?;

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
