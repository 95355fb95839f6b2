//! Build-time selection of the kernel lookup variant.
//!
//! Exactly one variant is compiled per target.  Each exports
//! `snapshot(pid)`, which performs the whole lookup in one pass: query the
//! process table for exactly one record, query the page size and logical CPU
//! count, decode the record into the portable model, and release any kernel
//! handle before returning.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::snapshot;

#[cfg(target_os = "openbsd")]
mod openbsd;
#[cfg(target_os = "openbsd")]
pub use openbsd::snapshot;

#[cfg(target_os = "netbsd")]
mod netbsd;
#[cfg(target_os = "netbsd")]
pub use netbsd::snapshot;

#[cfg(target_os = "dragonfly")]
mod dragonfly;
#[cfg(target_os = "dragonfly")]
pub use dragonfly::snapshot;

#[cfg(target_os = "freebsd")]
mod freebsd;
#[cfg(target_os = "freebsd")]
pub use freebsd::snapshot;

#[cfg(any(target_os = "netbsd", target_os = "dragonfly", target_os = "freebsd"))]
mod kvm;

#[cfg(any(
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly",
    target_os = "freebsd"
))]
mod params;

/// Decodes a fixed-width, nul-padded string field of a kernel record.
///
/// An empty field decodes to `None`.
#[cfg(any(
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly",
    target_os = "freebsd"
))]
fn cstr_field(field: &[libc::c_char]) -> Option<String> {
    let bytes: Vec<u8> = field
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    if bytes.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }
}
