//! Lookup through the `/proc` filesystem.
//!
//! A descriptor to `/proc/<pid>` is held open for the duration of the
//! lookup, so that `stat` and `wchan` are read from the same process even if
//! the pid is reused in between.  The snapshot needs three reads: the
//! per-process `stat` (state, start ticks, resident pages, last-run cpu),
//! the per-process `wchan` (wait-channel symbol), and the system-wide
//! `/proc/stat` (boot time and cpu count).

use psnap_core::tables::linux as tables;
use psnap_core::{expect, from_str};
use psnap_core::{label, IoErrorWrapper, ProcessSnapshot, SchedInfo, SnapError, SnapResult};

use rustix::fd::OwnedFd;
use rustix::fs::{Mode, OFlags};
use std::io::Read;
use std::path::Path;

macro_rules! wrap_io_error {
    ($path:expr, $expr:expr) => {
        match $expr {
            Ok(v) => Ok(v),
            Err(e) => {
                let e = std::io::Error::from(e);
                let kind = e.kind();
                Err(std::io::Error::new(
                    kind,
                    IoErrorWrapper {
                        path: $path.to_owned(),
                        inner: e.into(),
                    },
                ))
            }
        }
    };
}

/// The fields of `/proc/<pid>/stat` this tool consumes.
#[derive(Debug, PartialEq, Eq)]
struct PidStat {
    pid: i32,
    state: char,
    /// Time the process started after boot, in clock ticks.
    starttime: u64,
    /// Resident set size, in pages.
    rss: u64,
    /// CPU the process last ran on (kernels 2.2.8 and later).
    processor: Option<u32>,
}

fn parse_stat(buf: &str) -> SnapResult<PidStat> {
    let buf = buf.trim();

    // the comm field is wrapped in parens and may itself contain spaces and
    // parens, so split around the outermost pair
    let start_paren = expect!(buf.find('('));
    let end_paren = expect!(buf.rfind(')'));
    let pid = from_str!(i32, buf[..start_paren].trim_end());
    let rest = &buf[end_paren + 2..];

    let mut fields = rest.split(' ');
    // state is field 3; starttime, rss and processor are fields 22, 24, 39
    let state = expect!(expect!(fields.next()).chars().next());
    let starttime = from_str!(u64, expect!(fields.nth(18)));
    let rss = from_str!(u64, expect!(fields.nth(1)));
    let processor = match fields.nth(14) {
        Some(s) => Some(from_str!(u32, s)),
        None => None,
    };

    Ok(PidStat {
        pid,
        state,
        starttime,
        rss,
        processor,
    })
}

/// Boot time (seconds since the epoch) and logical cpu count, both from
/// `/proc/stat`.
fn kernel_stat(proc_root: &Path) -> SnapResult<(i64, usize)> {
    let path = proc_root.join("stat");
    let mut file = wrap_io_error!(path, std::fs::File::open(&path))?;
    let mut buf = String::new();
    wrap_io_error!(path, file.read_to_string(&mut buf))?;

    let mut btime = None;
    let mut cpu_count = 0;
    for line in buf.lines() {
        if let Some(rest) = line.strip_prefix("btime ") {
            btime = Some(from_str!(i64, rest.trim()));
        } else if line.starts_with("cpu") && line.as_bytes().get(3).is_some_and(|b| b.is_ascii_digit())
        {
            cpu_count += 1;
        }
    }
    Ok((expect!(btime, "no btime in /proc/stat"), cpu_count.max(1)))
}

/// Reads one file under the held `/proc/<pid>` descriptor.
fn read_at(root: &Path, dirfd: &OwnedFd, name: &str) -> SnapResult<String> {
    let path = root.join(name);
    let fd = wrap_io_error!(
        path,
        rustix::fs::openat(dirfd, name, OFlags::RDONLY | OFlags::CLOEXEC, Mode::empty())
    )?;
    let mut file = std::fs::File::from(fd);
    let mut buf = String::new();
    wrap_io_error!(path, file.read_to_string(&mut buf))?;
    Ok(buf)
}

pub fn snapshot(pid: i32) -> SnapResult<ProcessSnapshot> {
    snapshot_with_root(Path::new("/proc"), pid)
}

fn snapshot_with_root(proc_root: &Path, pid: i32) -> SnapResult<ProcessSnapshot> {
    let root = proc_root.join(pid.to_string());
    let dirfd = wrap_io_error!(
        root,
        rustix::fs::openat(
            rustix::fs::CWD,
            &root,
            OFlags::PATH | OFlags::DIRECTORY | OFlags::CLOEXEC,
            Mode::empty()
        )
    )?;

    let stat = parse_stat(&read_at(&root, &dirfd, "stat")?)?;
    if stat.pid != pid {
        return Err(SnapError::NoRecord { pid, count: 0 });
    }

    // wchan holds a kernel symbol name, or "0" when the process is not
    // blocked in the kernel; the file itself needs CONFIG_KALLSYMS
    let wait_channel = match read_at(&root, &dirfd, "wchan") {
        Ok(w) => {
            let w = w.trim();
            if w.is_empty() || w == "0" {
                None
            } else {
                Some(w.to_string())
            }
        }
        Err(SnapError::NotFound(_)) | Err(SnapError::PermissionDenied(_)) => None,
        Err(e) => return Err(e),
    };

    let (btime, cpu_count) = kernel_stat(proc_root)?;
    let start_time = btime + (stat.starttime / rustix::param::clock_ticks_per_second()) as i64;

    let state_code = tables::code_for_state_char(stat.state);
    let mut sched = SchedInfo::new(state_code);
    sched.wait_channel = wait_channel;
    sched.cpu = stat.processor;
    sched.on_cpu = state_code == tables::RUNNING;
    let state_label = label::render_label(&tables::POLICY, &sched, cpu_count);

    Ok(ProcessSnapshot {
        pid,
        resident_pages: stat.rss,
        page_size: rustix::param::page_size() as u64,
        start_time,
        state_code,
        state_label,
        cpu_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT_LINE: &str = "1234 (tmux: server (x)) S 1 1234 1234 0 -1 4194624 1339 0 0 0 3 7 0 0 20 0 1 0 5189 8265728 451 18446744073709551615 1 1 0 0 0 0 0 3670020 1247 0 0 0 17 3 0 0 0 0 0 0 0 0 0 0 0 0 0";

    #[test]
    fn test_parse_stat() {
        let stat = parse_stat(STAT_LINE).unwrap();
        assert_eq!(
            stat,
            PidStat {
                pid: 1234,
                state: 'S',
                starttime: 5189,
                rss: 451,
                processor: Some(3),
            }
        );
    }

    #[test]
    fn test_parse_stat_without_processor_field() {
        // kernels before 2.2.8 stop after cnswap (field 37; the comm field
        // in the fixture spans three tokens, so that is 39 tokens in)
        let truncated: Vec<&str> = STAT_LINE.split(' ').take(39).collect();
        let stat = parse_stat(&truncated.join(" ")).unwrap();
        assert_eq!(stat.processor, None);
    }

    #[test]
    fn test_parse_stat_garbage_is_internal_error() {
        assert!(matches!(
            parse_stat("not a stat line"),
            Err(SnapError::InternalError(_))
        ));
    }

    #[test]
    fn test_snapshot_self() {
        let pid = std::process::id() as i32;
        let snap = snapshot(pid).unwrap();

        assert_eq!(snap.pid, pid);
        assert!(snap.rss_bytes() > 0);
        assert_eq!(snap.rss_bytes(), snap.resident_pages * snap.page_size);
        assert!(!snap.state_label.is_empty());
        assert!(snap.cpu_count >= 1);

        // this process is alive, so it started at or before "now"
        let now = std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        assert!(snap.start_time <= now + 1);
    }

    #[test]
    fn test_snapshot_vanished_process() {
        let mut command = std::process::Command::new("sleep")
            .arg("10000")
            .spawn()
            .expect("Failed to start sleep");
        let pid = command.id() as i32;

        let snap = snapshot(pid).expect("Failed to snapshot sleep");
        assert!(snap.rss_bytes() > 0);
        assert!(!snap.state_label.is_empty());
        // the child was spawned moments ago
        let now = std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        assert!((now - snap.start_time).abs() < 10);

        command.kill().expect("Failed to kill sleep");
        command.wait().expect("Failed to wait for sleep");

        let e = snapshot(pid).unwrap_err();
        assert!(matches!(
            e,
            SnapError::NotFound(_) | SnapError::NoRecord { .. }
        ));
    }

    #[test]
    fn test_snapshot_pid1() {
        match snapshot(1) {
            Ok(snap) => {
                assert!(snap.rss_bytes() > 0);
                assert!(!snap.state_label.is_empty());
                assert!(snap.start_time > 0);
            }
            // pid 1 always exists, but its files may be restricted
            Err(SnapError::PermissionDenied(_)) => {
                assert!(!rustix::process::geteuid().is_root());
            }
            Err(e) => panic!("unexpected error for pid 1: {:?}", e),
        }
    }

    #[test]
    fn test_snapshot_missing_pid_is_not_found() {
        // far beyond the default pid_max
        let e = snapshot(999_999_999).unwrap_err();
        assert!(matches!(e, SnapError::NotFound(_)));
    }

    #[test]
    fn test_page_size_matches_sysconf() {
        let snap = snapshot(std::process::id() as i32).unwrap();
        let sysconf = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        assert_eq!(snap.page_size as i64, sysconf);
    }
}
