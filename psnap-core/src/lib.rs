#![deny(rustdoc::broken_intra_doc_links, rustdoc::invalid_html_tags)]
//! Portable data model for one-shot process snapshots.
//!
//! This crate holds everything about a snapshot that does not touch a kernel
//! interface: the [`ProcessSnapshot`] entity, the state-label rule engine in
//! [`label`], the per-platform label policies in [`tables`], and the
//! [`SnapError`] type. The kernel lookups themselves live in the `psnap`
//! crate; splitting them out keeps the decoding and rendering logic
//! buildable and testable on any host.
//!
//! # Cargo features
//!
//! * `backtrace` -- Optional.  Lets you get a stack trace whenever an
//!   [`InternalError`] is raised.
//! * `serde1` -- Optional.  Derives `Serialize`/`Deserialize` on the public
//!   data model.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Builds an [`InternalError`](crate::InternalError) annotated with the
/// current file and line.
///
/// Internal errors mean a bug in psnap's own decoding, never bad input.
#[macro_export]
macro_rules! build_internal_error {
    ($err: expr) => {
        $crate::SnapError::InternalError($crate::InternalError {
            msg: format!("Internal Unwrap Error: {}", $err),
            file: file!(),
            line: line!(),
            #[cfg(feature = "backtrace")]
            backtrace: backtrace::Backtrace::new(),
        })
    };
    ($err: expr, $msg: expr) => {
        $crate::SnapError::InternalError($crate::InternalError {
            msg: format!("Internal Unwrap Error: {}: {}", $msg, $err),
            file: file!(),
            line: line!(),
            #[cfg(feature = "backtrace")]
            backtrace: backtrace::Backtrace::new(),
        })
    };
}

/// Unwraps an `Option` or `Result`, turning the failure case into an
/// [`InternalError`](crate::InternalError) early-return.
#[macro_export]
macro_rules! expect {
    ($e:expr) => {
        match $crate::IntoResult::into($e) {
            Ok(v) => v,
            Err(e) => return Err($crate::build_internal_error!(e)),
        }
    };
    ($e:expr, $msg:expr) => {
        match $crate::IntoResult::into($e) {
            Ok(v) => v,
            Err(e) => return Err($crate::build_internal_error!(e, $msg)),
        }
    };
}

/// Parses a decimal integer field, reporting the offending text on failure.
#[macro_export]
macro_rules! from_str {
    ($t:tt, $e:expr) => {{
        let e = $e;
        $crate::expect!(
            $t::from_str_radix(e, 10),
            format!("Failed to parse {} ({:?}) as a {}", stringify!($e), e, stringify!($t))
        )
    }};
}

#[doc(hidden)]
pub trait IntoResult<T, E> {
    fn into(t: Self) -> Result<T, E>;
}

impl<T, E> IntoResult<T, E> for Result<T, E> {
    fn into(t: Self) -> Result<T, E> {
        t
    }
}

impl<T> IntoResult<T, &'static str> for Option<T> {
    fn into(t: Self) -> Result<T, &'static str> {
        t.ok_or("Option is None")
    }
}

/// An error that occurred while taking a process snapshot.
#[derive(Debug)]
pub enum SnapError {
    /// Wrong command-line usage.  No kernel query is attempted.
    Usage(&'static str),
    /// Permission was denied while querying the kernel.
    PermissionDenied(Option<PathBuf>),
    /// The kernel interface (or a file under it) was not found.
    NotFound(Option<PathBuf>),
    /// The process-table query did not yield exactly one record.
    NoRecord { pid: i32, count: usize },
    /// The process-table query itself failed.
    Lookup(String),
    /// A kernel-interface handle could not be closed after use.
    ///
    /// Fatal even though the data was already obtained: the tool must not
    /// report a snapshot it could not finish reading cleanly.
    Cleanup(String),
    /// Any other I/O error, with the path involved when one is known.
    Io(io::Error, Option<PathBuf>),
    /// A bug in psnap's own decoding.
    InternalError(InternalError),
}

/// The result type for snapshot operations.
pub type SnapResult<T> = Result<T, SnapError>;

impl fmt::Display for SnapError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use SnapError::*;
        match self {
            Usage(msg) => write!(f, "{}", msg),
            PermissionDenied(Some(p)) => write!(f, "permission denied: {}", p.display()),
            PermissionDenied(None) => write!(f, "permission denied"),
            NotFound(Some(p)) => write!(f, "not found: {}", p.display()),
            NotFound(None) => write!(f, "not found"),
            NoRecord { pid, count: 0 } => write!(f, "no process record for pid {}", pid),
            NoRecord { pid, count } => write!(f, "{} process records for pid {}", count, pid),
            Lookup(msg) => write!(f, "process table lookup failed: {}", msg),
            Cleanup(msg) => write!(f, "cannot release kernel handle: {}", msg),
            Io(e, Some(p)) => write!(f, "{}: {}", p.display(), e),
            Io(e, None) => write!(f, "{}", e),
            InternalError(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl std::error::Error for SnapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapError::Io(e, _) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SnapError {
    fn from(io: io::Error) -> Self {
        use std::io::ErrorKind;
        // If the error was wrapped by the platform layer, pull out the path
        // it recorded.
        let path = io
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<IoErrorWrapper>())
            .map(|wrapper| wrapper.path.clone());
        match io.kind() {
            ErrorKind::PermissionDenied => SnapError::PermissionDenied(path),
            ErrorKind::NotFound => SnapError::NotFound(path),
            // ESRCH: the process exited between opening its directory and
            // reading a file under it
            _ if io.raw_os_error() == Some(3) => SnapError::NotFound(path),
            _ => SnapError::Io(io, path),
        }
    }
}

/// An I/O error annotated with the path that produced it.
///
/// The platform layer wraps its reads in this so that [`SnapError`] can name
/// the file involved.
#[derive(Debug)]
pub struct IoErrorWrapper {
    pub path: PathBuf,
    pub inner: Box<dyn std::error::Error + Send + Sync>,
}

impl fmt::Display for IoErrorWrapper {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "IO Error({}): {}", self.path.display(), self.inner)
    }
}

impl std::error::Error for IoErrorWrapper {}

/// An internal error in the psnap crates.
///
/// If you encounter this error, consider it a bug in psnap.
#[derive(Debug)]
pub struct InternalError {
    pub msg: String,
    pub file: &'static str,
    pub line: u32,
    #[cfg(feature = "backtrace")]
    pub backtrace: backtrace::Backtrace,
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "bug at {}:{} (please report this psnap bug)\n{}",
            self.file, self.line, self.msg
        )
    }
}

pub mod label;
pub mod tables;

mod snapshot;
pub use snapshot::*;

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapped_not_found() -> io::Error {
        let inner = io::Error::from(io::ErrorKind::NotFound);
        io::Error::new(
            inner.kind(),
            IoErrorWrapper {
                path: PathBuf::from("/proc/1234/stat"),
                inner: inner.into(),
            },
        )
    }

    #[test]
    fn test_io_error_keeps_path() {
        match SnapError::from(wrapped_not_found()) {
            SnapError::NotFound(Some(p)) => assert_eq!(p, PathBuf::from("/proc/1234/stat")),
            e => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn test_esrch_is_not_found() {
        let err = io::Error::from_raw_os_error(3);
        assert!(matches!(SnapError::from(err), SnapError::NotFound(None)));
    }

    #[test]
    fn test_no_record_display() {
        let none = SnapError::NoRecord { pid: 7, count: 0 };
        assert_eq!(none.to_string(), "no process record for pid 7");
        let many = SnapError::NoRecord { pid: 7, count: 3 };
        assert_eq!(many.to_string(), "3 process records for pid 7");
    }

    #[test]
    fn test_expect_internal_error() {
        fn inner() -> SnapResult<u32> {
            let v: Option<u32> = None;
            Ok(expect!(v, "missing field"))
        }
        match inner() {
            Err(SnapError::InternalError(e)) => assert!(e.msg.contains("missing field")),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
