//! The portable snapshot entity and its one-line rendering.

use crate::SnapResult;
use chrono::TimeZone;
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

/// One process's kernel-resident state, decoded from a platform record.
///
/// A snapshot is populated exactly once per run, by the platform lookup, and
/// is read-only afterwards.  It is never constructed unless the kernel query
/// yielded exactly one record for the requested pid.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct ProcessSnapshot {
    /// The process ID the lookup was made for.
    pub pid: i32,
    /// Resident-set size in pages, as reported by the kernel.
    pub resident_pages: u64,
    /// Memory page size in bytes at the time of the lookup.
    pub page_size: u64,
    /// Process creation time, in seconds since the epoch.
    pub start_time: i64,
    /// Raw scheduling-state code from the kernel record.
    pub state_code: u32,
    /// Human-readable rendering of the scheduling state.
    ///
    /// See [`crate::label::render_label`] for how this is produced.
    pub state_label: String,
    /// Number of logical CPUs on the host.
    pub cpu_count: usize,
}

impl ProcessSnapshot {
    /// Resident-set size in bytes.
    ///
    /// This is `resident_pages` multiplied by the page size.
    pub fn rss_bytes(&self) -> u64 {
        self.resident_pages * self.page_size
    }

    /// Resident-set size in kibibytes, truncated.
    pub fn rss_kib(&self) -> u64 {
        self.rss_bytes() / 1024
    }

    /// Renders the snapshot as the tool's single output line:
    ///
    /// ```text
    /// pid:<int> rss:<bytes> rss:<kib> KiB state:<label> start:<YYYY>/<MM>/<DD> <HH>:<MM>:<SS>
    /// ```
    ///
    /// The start time is rendered in local time.  The only failure mode is a
    /// start timestamp outside the representable calendar range.
    pub fn render_line(&self) -> SnapResult<String> {
        let start = expect!(
            chrono::Local.timestamp_opt(self.start_time, 0).single(),
            "start time out of range"
        );
        Ok(format!(
            "pid:{} rss:{} rss:{} KiB state:{} start:{}",
            self.pid,
            self.rss_bytes(),
            self.rss_kib(),
            self.state_label,
            start.format("%Y/%m/%d %H:%M:%S")
        ))
    }
}

/// The scheduling-related fields of one kernel process record, decoded into
/// a portable form.
///
/// This is the input to [`crate::label::render_label`]; each platform fills
/// in whichever fields its record actually carries.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct SchedInfo {
    /// Raw scheduling-state code.
    pub state_code: u32,
    /// Named kernel resource the process is blocked on, when any.
    pub wait_channel: Option<String>,
    /// Named lock the process is blocked on, when the kernel flagged the
    /// block as lock contention.
    pub lock_name: Option<String>,
    /// CPU index the record names for this process.
    pub cpu: Option<u32>,
    /// Whether the process is executing on that CPU right now.
    pub on_cpu: bool,
    /// Process-level zombie flag, on kernels that report it outside the
    /// per-thread state.
    pub zombie: bool,
}

impl SchedInfo {
    pub fn new(state_code: u32) -> SchedInfo {
        SchedInfo {
            state_code,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ProcessSnapshot {
        ProcessSnapshot {
            pid: 42,
            resident_pages: 3,
            page_size: 512,
            start_time: 1_000_000,
            state_code: 2,
            state_label: "run".to_string(),
            cpu_count: 1,
        }
    }

    #[test]
    fn test_rss_math() {
        let snap = snapshot();
        assert_eq!(snap.rss_bytes(), 1536);
        // KiB truncates, never rounds up
        assert_eq!(snap.rss_kib(), 1);
    }

    #[test]
    fn test_render_line() {
        let line = snapshot().render_line().unwrap();
        assert!(line.starts_with("pid:42 rss:1536 rss:1 KiB state:run start:"));

        // the start field is YYYY/MM/DD HH:MM:SS in local time
        let start = line.rsplit("start:").next().unwrap().as_bytes();
        assert_eq!(start.len(), 19);
        for (i, b) in start.iter().enumerate() {
            match i {
                4 | 7 => assert_eq!(*b, b'/'),
                10 => assert_eq!(*b, b' '),
                13 | 16 => assert_eq!(*b, b':'),
                _ => assert!(b.is_ascii_digit(), "unexpected byte {} at {}", b, i),
            }
        }
    }

    #[cfg(feature = "serde1")]
    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&snapshot()).unwrap();
        assert!(json.contains("\"state_label\":\"run\""));
    }
}
