//! Per-platform state-name tables and label policies.
//!
//! Each module mirrors one kernel's scheduling-state numbering and the
//! precedence its native tools use when rendering a state column.  The
//! policies are plain data, so every platform's precedence is compiled and
//! tested regardless of the build target; only the decoders in the `psnap`
//! crate are platform-gated.

use crate::label::{LabelPolicy, LabelRule};

pub mod openbsd {
    //! `p_stat` codes from OpenBSD's `sys/proc.h`.

    use super::*;

    pub const SIDL: u32 = 1;
    pub const SRUN: u32 = 2;
    pub const SSLEEP: u32 = 3;
    pub const SSTOP: u32 = 4;
    pub const SZOMB: u32 = 5;
    pub const SDEAD: u32 = 6;
    pub const SONPROC: u32 = 7;

    pub const STATE_NAMES: &[&str] = &["", "start", "run", "sleep", "stop", "zomb", "dead", "onproc"];

    /// Wait channel first (whatever the state), then the `state/cpu` form,
    /// then the plain table name.
    pub const POLICY: LabelPolicy = LabelPolicy {
        table: STATE_NAMES,
        wait_channel_width: 8,
        rules: &[
            LabelRule::WaitChannel { states: &[] },
            LabelRule::CpuSuffix { sleep_state: SSLEEP },
            LabelRule::Table,
        ],
    };
}

pub mod netbsd {
    //! Per-lwp `l_stat` codes from NetBSD's `sys/lwp.h`, as surfaced in
    //! `kinfo_proc2.p_stat`.

    use super::*;

    pub const LSIDL: u32 = 1;
    pub const LSRUN: u32 = 2;
    pub const LSSLEEP: u32 = 3;
    pub const LSSTOP: u32 = 4;
    pub const LSZOMB: u32 = 5;
    pub const LSDEAD: u32 = 6;
    pub const LSONPROC: u32 = 7;

    pub const STATE_NAMES: &[&str] = &["", "IDLE", "RUN", "SLEEP", "STOP", "ZOMB", "DEAD", "CPU"];

    /// The `name/cpu` form first whenever a CPU is named (using the wait
    /// channel as the name while sleeping), then the wait channel alone,
    /// then the table.
    pub const POLICY: LabelPolicy = LabelPolicy {
        table: STATE_NAMES,
        wait_channel_width: 6,
        rules: &[
            LabelRule::CpuSuffix { sleep_state: LSSLEEP },
            LabelRule::WaitChannel { states: &[LSSLEEP] },
            LabelRule::Table,
        ],
    };
}

pub mod dragonfly {
    //! Per-lwp `kl_stat` codes from DragonFly's `sys/kinfo.h`.  The
    //! process-level `kp_stat` only contributes the zombie override.

    use super::*;

    pub const LSRUN: u32 = 1;
    pub const LSSTOP: u32 = 2;
    pub const LSSLEEP: u32 = 3;

    pub const STATE_NAMES: &[&str] = &["", "RUN", "STOP", "SLEEP"];

    /// Zombie override, then `CPU<n>` for a thread the scheduler is
    /// running, then the wait channel while sleeping, then the table.
    pub const POLICY: LabelPolicy = LabelPolicy {
        table: STATE_NAMES,
        wait_channel_width: 8,
        rules: &[
            LabelRule::Zombie,
            LabelRule::OnCpu,
            LabelRule::WaitChannel { states: &[LSSLEEP] },
            LabelRule::Table,
        ],
    };
}

pub mod freebsd {
    //! `ki_stat` codes from FreeBSD's `sys/proc.h`.

    use super::*;

    pub const SIDL: u32 = 1;
    pub const SRUN: u32 = 2;
    pub const SSLEEP: u32 = 3;
    pub const SSTOP: u32 = 4;
    pub const SZOMB: u32 = 5;
    pub const SWAIT: u32 = 6;
    pub const SLOCK: u32 = 7;

    pub const STATE_NAMES: &[&str] = &["", "START", "RUN", "SLEEP", "STOP", "ZOMB", "WAIT", "LOCK"];

    /// `CPU<n>` while running on a CPU, then the named lock for a
    /// lock-contended block, then the wait channel (sleeping, or
    /// lock-waiting without a named lock), then the table.
    pub const POLICY: LabelPolicy = LabelPolicy {
        table: STATE_NAMES,
        wait_channel_width: 6,
        rules: &[
            LabelRule::OnCpu,
            LabelRule::LockName { state: SLOCK },
            LabelRule::WaitChannel { states: &[SSLEEP, SLOCK] },
            LabelRule::Table,
        ],
    };
}

pub mod linux {
    //! Linux reports the state as a single character in field 3 of
    //! `/proc/<pid>/stat`; the codes here are positions in [`STATE_NAMES`].

    use super::*;

    pub const RUNNING: u32 = 1;
    pub const SLEEPING: u32 = 2;
    pub const DISK_SLEEP: u32 = 3;
    pub const STOPPED: u32 = 4;
    pub const TRACING_STOP: u32 = 5;
    pub const ZOMBIE: u32 = 6;
    pub const DEAD: u32 = 7;
    pub const IDLE: u32 = 8;

    pub const STATE_NAMES: &[&str] = &["", "RUN", "SLEEP", "DISK", "STOP", "TRACE", "ZOMB", "DEAD", "IDLE"];

    /// Maps the `stat` state character to a state code.  Characters outside
    /// the known set map to their code point, which the table then renders
    /// as `?<code>`.
    pub fn code_for_state_char(c: char) -> u32 {
        match c {
            'R' => RUNNING,
            'S' => SLEEPING,
            'D' => DISK_SLEEP,
            'T' => STOPPED,
            't' => TRACING_STOP,
            'Z' => ZOMBIE,
            'X' | 'x' => DEAD,
            'I' => IDLE,
            _ => c as u32,
        }
    }

    /// `CPU<n>` while running, then the wait channel for either sleep
    /// state, then the table.
    pub const POLICY: LabelPolicy = LabelPolicy {
        table: STATE_NAMES,
        wait_channel_width: 6,
        rules: &[
            LabelRule::OnCpu,
            LabelRule::WaitChannel { states: &[SLEEPING, DISK_SLEEP] },
            LabelRule::Table,
        ],
    };
}
