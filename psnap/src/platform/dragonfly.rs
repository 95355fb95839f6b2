//! Lookup through `libkvm`'s `kvm_getprocs`.
//!
//! DragonFly reports the run state per lwp; the process-level `kp_stat`
//! only contributes the zombie case.

use psnap_core::tables::dragonfly as tables;
use psnap_core::{label, ProcessSnapshot, SchedInfo, SnapError, SnapResult};

use super::kvm::{kvm_t, KvmHandle};
use super::params;
use bitflags::bitflags;
use std::ptr;

/// Process-level `kp_stat` zombie code from `sys/proc.h`.
const SZOMB: u8 = 4;

bitflags! {
    /// Thread flags from `sys/thread.h`; only the running bit matters here.
    #[derive(Debug, Clone, Copy)]
    struct TdFlags: u64 {
        const RUNNING = 0x0000_0001;
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

    let lwp = &kip.kp_lwp;
    let mut sched = SchedInfo::new(u32::from(lwp.kl_stat as u8));
    sched.zombie = kip.kp_stat as u8 == SZOMB;
    sched.wait_channel = super::cstr_field(&lwp.kl_wmesg);
    sched.on_cpu = sched.state_code == tables::LSRUN
        && TdFlags::from_bits_truncate(lwp.kl_tdflags as u64).contains(TdFlags::RUNNING);
    if lwp.kl_cpuid >= 0 {
        sched.cpu = Some(lwp.kl_cpuid as u32);
    }
    let state_label = label::render_label(&tables::POLICY, &sched, cpu_count);

    Ok(ProcessSnapshot {
        pid,
        resident_pages: kip.kp_vm_rssize as u64,
        page_size: params::page_size(),
        start_time: kip.kp_start.tv_sec as i64,
        state_code: sched.state_code,
        state_label,
        cpu_count,
    })
}
