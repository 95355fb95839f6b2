//! End-to-end tests driving the built binary.

#![cfg(target_os = "linux")]

use std::process::Command;

fn psnap() -> Command {
    Command::new(env!("CARGO_BIN_EXE_psnap"))
}

#[test]
fn no_arguments_is_fatal() {
    let out = psnap().output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(!out.stderr.is_empty());
}

#[test]
fn extra_arguments_are_fatal() {
    let out = psnap().args(["1", "2"]).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
}

#[test]
fn unknown_pid_is_fatal() {
    // far beyond the largest configurable pid_max
    let out = psnap().arg("999999999").output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(!out.stderr.is_empty());
}

#[test]
fn malformed_pid_reads_as_missing_record() {
    // atoi semantics: "bogus" queries pid 0, which /proc has no entry for
    let out = psnap().arg("bogus").output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
}

#[test]
fn self_pid_prints_one_line() {
    let pid = std::process::id();
    let out = psnap().arg(pid.to_string()).output().unwrap();
    assert_eq!(out.status.code(), Some(0));
    assert!(out.stderr.is_empty());

    let stdout = String::from_utf8(out.stdout).unwrap();
    let mut lines = stdout.lines();
    let line = lines.next().unwrap();
    assert!(lines.next().is_none());

    assert!(line.starts_with(&format!("pid:{} rss:", pid)));
    assert!(line.contains(" KiB state:"));
    assert!(line.contains(" start:"));
}
