#![deny(rustdoc::broken_intra_doc_links, rustdoc::invalid_html_tags)]
//! Report one process's resident memory, scheduling state and start time.
//!
//! psnap takes a single process identifier, reads that process's record out
//! of the host kernel's process table, and prints one line:
//!
//! ```text
//! $ psnap 1234
//! pid:1234 rss:2158592 rss:2108 KiB state:kqread start:2026/08/05 10:11:12
//! ```
//!
//! The kernel interface differs per platform and is selected at build time:
//! the `/proc` filesystem on Linux, a `sysctl(2)` table read on OpenBSD, and
//! the `libkvm` kernel-memory library on FreeBSD, NetBSD and DragonFly.
//! Each variant decodes its native record once into the portable
//! [`ProcessSnapshot`]; everything downstream of [`snapshot`] is
//! platform-independent and lives in the `psnap-core` crate.
//!
//! This is a one-shot diagnostic: there is no polling, no caching, and no
//! retry.  Any failure to obtain exactly one clean record is fatal.

pub use psnap_core::*;

mod platform;
pub use platform::snapshot;
