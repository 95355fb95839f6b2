//! The state-label rule engine.
//!
//! Each platform decodes its kernel record into a [`SchedInfo`] and pairs it
//! with a [`LabelPolicy`]; the display label is produced by evaluating the
//! policy's rules in order and taking the first that applies.  Keeping the
//! precedence as data rather than nested conditionals lets each platform's
//! ordering be exercised by the test suite on any host.  The policies
//! themselves live in [`crate::tables`].

use crate::SchedInfo;

/// One step of a platform's label precedence.
///
/// Rules are evaluated in order; the first one that produces a label wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelRule {
    /// A process-level zombie wins over whatever state its thread is in.
    Zombie,
    /// `CPU<n>` for a process currently executing on a CPU.  Skipped on a
    /// single-CPU host, or when the record names no CPU.
    OnCpu,
    /// `*<lock>` when the process is blocked on a named lock and the state
    /// code matches.
    LockName { state: u32 },
    /// `<base>/<n>`: the CPU index appended to the wait channel (when the
    /// process is in `sleep_state`) or to the table name otherwise.  Skipped
    /// on a single-CPU host, or when the record names no CPU.
    CpuSuffix { sleep_state: u32 },
    /// The wait-channel name, when the state code is one of `states` (any
    /// state when the list is empty).
    WaitChannel { states: &'static [u32] },
    /// Ordered state-name table lookup.  Codes outside the table, or naming
    /// an empty entry, render as `?<code>`; this is a display fallback for
    /// future kernel states, never an error.
    Table,
}

/// A platform's display contract for state labels.
#[derive(Debug, Clone, Copy)]
pub struct LabelPolicy {
    /// State names indexed by state code.
    pub table: &'static [&'static str],
    /// Width wait-channel names are truncated to.
    pub wait_channel_width: usize,
    /// Precedence list.  Must end with a rule that always applies.
    pub rules: &'static [LabelRule],
}

impl LabelPolicy {
    fn table_name(&self, code: u32) -> String {
        match self.table.get(code as usize) {
            Some(name) if !name.is_empty() => (*name).to_string(),
            _ => format!("?{}", code),
        }
    }

    fn wait_channel<'a>(&self, sched: &'a SchedInfo) -> Option<&'a str> {
        sched.wait_channel.as_deref().filter(|w| !w.is_empty())
    }
}

/// Renders the display label for one decoded scheduling state.
///
/// The label is never empty: a sleep state with no wait channel falls back
/// to the state-name table, and unknown codes render as `?<code>`.
pub fn render_label(policy: &LabelPolicy, sched: &SchedInfo, cpu_count: usize) -> String {
    for rule in policy.rules {
        match *rule {
            LabelRule::Zombie if sched.zombie => return "ZOMB".to_string(),
            LabelRule::OnCpu if sched.on_cpu && cpu_count > 1 => {
                if let Some(cpu) = sched.cpu {
                    return format!("CPU{}", cpu);
                }
            }
            LabelRule::LockName { state } if sched.state_code == state => {
                if let Some(lock) = sched.lock_name.as_deref().filter(|l| !l.is_empty()) {
                    return format!("*{}", lock);
                }
            }
            LabelRule::CpuSuffix { sleep_state } if cpu_count > 1 => {
                if let Some(cpu) = sched.cpu {
                    let base = match policy.wait_channel(sched) {
                        Some(w) if sched.state_code == sleep_state => {
                            truncate(w, policy.wait_channel_width)
                        }
                        _ => policy.table_name(sched.state_code),
                    };
                    return format!("{}/{}", base, cpu);
                }
            }
            LabelRule::WaitChannel { states } => {
                if states.is_empty() || states.contains(&sched.state_code) {
                    if let Some(w) = policy.wait_channel(sched) {
                        return truncate(w, policy.wait_channel_width);
                    }
                }
            }
            LabelRule::Table => return policy.table_name(sched.state_code),
            _ => {}
        }
    }
    // every shipped policy ends with Table; stay total for hand-built ones
    policy.table_name(sched.state_code)
}

fn truncate(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[&str] = &["", "idle", "run", "sleep"];
    const POLICY: LabelPolicy = LabelPolicy {
        table: TABLE,
        wait_channel_width: 6,
        rules: &[
            LabelRule::Zombie,
            LabelRule::OnCpu,
            LabelRule::LockName { state: 3 },
            LabelRule::CpuSuffix { sleep_state: 3 },
            LabelRule::WaitChannel { states: &[3] },
            LabelRule::Table,
        ],
    };

    fn sched(state_code: u32) -> SchedInfo {
        SchedInfo::new(state_code)
    }

    #[test]
    fn test_table_lookup() {
        assert_eq!(render_label(&POLICY, &sched(2), 1), "run");
    }

    #[test]
    fn test_unknown_code_renders_with_marker() {
        assert_eq!(render_label(&POLICY, &sched(17), 1), "?17");
        // index 0 is an empty table entry, which is just as unknown
        assert_eq!(render_label(&POLICY, &sched(0), 1), "?0");
    }

    #[test]
    fn test_zombie_overrides_everything() {
        let mut s = sched(2);
        s.zombie = true;
        s.on_cpu = true;
        s.cpu = Some(1);
        assert_eq!(render_label(&POLICY, &s, 4), "ZOMB");
    }

    #[test]
    fn test_on_cpu_prefix() {
        let mut s = sched(2);
        s.on_cpu = true;
        s.cpu = Some(3);
        assert_eq!(render_label(&POLICY, &s, 4), "CPU3");
    }

    #[test]
    fn test_single_cpu_host_never_shows_an_index() {
        let mut s = sched(2);
        s.on_cpu = true;
        s.cpu = Some(0);
        assert_eq!(render_label(&POLICY, &s, 1), "run");

        let mut s = sched(3);
        s.cpu = Some(0);
        s.wait_channel = Some("biowait".to_string());
        assert_eq!(render_label(&POLICY, &s, 1), "biowai");
    }

    #[test]
    fn test_on_cpu_without_an_index_falls_through() {
        let mut s = sched(2);
        s.on_cpu = true;
        assert_eq!(render_label(&POLICY, &s, 4), "run");
    }

    #[test]
    fn test_lock_name_beats_wait_channel() {
        let mut s = sched(3);
        s.lock_name = Some("vmmaplk".to_string());
        s.wait_channel = Some("select".to_string());
        assert_eq!(render_label(&POLICY, &s, 1), "*vmmaplk");
    }

    #[test]
    fn test_lock_name_needs_matching_state() {
        let mut s = sched(2);
        s.lock_name = Some("vmmaplk".to_string());
        assert_eq!(render_label(&POLICY, &s, 1), "run");
    }

    #[test]
    fn test_cpu_suffix_uses_wait_channel_when_sleeping() {
        let mut s = sched(3);
        s.cpu = Some(1);
        s.wait_channel = Some("nanoslp".to_string());
        assert_eq!(render_label(&POLICY, &s, 2), "nanosl/1");
    }

    #[test]
    fn test_cpu_suffix_uses_table_otherwise() {
        let mut s = sched(2);
        s.cpu = Some(1);
        assert_eq!(render_label(&POLICY, &s, 2), "run/1");
    }

    #[test]
    fn test_wait_channel_truncation() {
        let mut s = sched(3);
        s.wait_channel = Some("kqueue_scan".to_string());
        assert_eq!(render_label(&POLICY, &s, 1), "kqueue");
    }

    #[test]
    fn test_empty_wait_channel_falls_back_to_table() {
        let mut s = sched(3);
        s.wait_channel = Some(String::new());
        assert_eq!(render_label(&POLICY, &s, 1), "sleep");
    }

    #[test]
    fn test_wait_channel_any_state() {
        const ANY: LabelPolicy = LabelPolicy {
            table: TABLE,
            wait_channel_width: 6,
            rules: &[LabelRule::WaitChannel { states: &[] }, LabelRule::Table],
        };
        let mut s = sched(2);
        s.wait_channel = Some("poll".to_string());
        assert_eq!(render_label(&ANY, &s, 1), "poll");
    }
}
