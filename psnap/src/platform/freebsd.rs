//! Lookup through `libkvm`'s `kvm_getprocs`.

use psnap_core::tables::freebsd as tables;
use psnap_core::{label, ProcessSnapshot, SchedInfo, SnapError, SnapResult};

use super::kvm::{kvm_t, KvmHandle};
use super::params;
use bitflags::bitflags;
use std::ptr;

/// `ki_oncpu` value for "not on any cpu" (`NOCPU` in `sys/proc.h`).
const NOCPU: libc::c_int = -1;

bitflags! {
    /// `ki_kiflag` bits from `sys/user.h`; only the lock-blocked bit
    /// matters here.
    #[derive(Debug, Clone, Copy)]
    struct KiFlags: i64 {
        const LOCKBLOCK = 0x01;
    }
}

#[link(name = "kvm")]
extern "C" {
    fn kvm_getprocs(
        kd: *mut kvm_t,
        op: libc::c_int,
        arg: libc::c_int,
        cnt: *mut libc::c_int,
    ) -> *mut libc::kinfo_proc;
}

pub fn snapshot(pid: i32) -> SnapResult<ProcessSnapshot> {
    let kvm = KvmHandle::open(0)?;

    let mut cnt: libc::c_int = 0;
    // SAFETY: kd is a live descriptor; the records belong to libkvm and are
    // copied out below, before the handle is closed
    let kip = unsafe { kvm_getprocs(kvm.raw(), libc::KERN_PROC_PID, pid, &mut cnt) };
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

    let mut sched = SchedInfo::new(u32::from(kip.ki_stat as u8));
    sched.wait_channel = super::cstr_field(&kip.ki_wmesg);
    // ki_lockname is only meaningful while the lock-blocked flag is up
    if KiFlags::from_bits_truncate(kip.ki_kiflag as i64).contains(KiFlags::LOCKBLOCK) {
        sched.lock_name = super::cstr_field(&kip.ki_lockname);
    }
    if kip.ki_oncpu != NOCPU {
        sched.cpu = Some(kip.ki_oncpu as u32);
        sched.on_cpu = sched.state_code == tables::SRUN;
    }
    let state_label = label::render_label(&tables::POLICY, &sched, cpu_count);

    Ok(ProcessSnapshot {
        pid,
        resident_pages: kip.ki_rssize as u64,
        page_size: params::page_size(),
        start_time: kip.ki_start.tv_sec as i64,
        state_code: sched.state_code,
        state_label,
        cpu_count,
    })
}
