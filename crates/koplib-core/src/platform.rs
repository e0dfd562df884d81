//! Platform abstraction for file replacement and contention classification.
//!
//! All `#[cfg]` blocks for OS-specific behavior live in this module rather
//! than scattered through the codebase. The rest of the crate asks two
//! questions: "does this platform block opens of in-use files?" (resolved
//! once via [`capabilities`]) and "was this failure a sharing violation?".
//!
//! # Platform Behavior
//! - **Linux/macOS**: advisory locking only; `rename` over an open file
//!   always succeeds, so replace is never retried and read failures are
//!   never transient.
//! - **Windows**: mandatory share locks; an open destination makes reads and
//!   replaces fail with `ERROR_SHARING_VIOLATION`, which callers retry.

use std::io;
use std::path::Path;

/// Capabilities of the platform's file primitives, resolved once at startup.
#[derive(Debug, Clone, Copy)]
pub struct FsCapabilities {
    /// True when the OS enforces mandatory share locks, making "file busy"
    /// a transient, retryable failure class.
    pub mandatory_share_locks: bool,
}

/// Resolve the current platform's file-contention capabilities.
pub const fn capabilities() -> FsCapabilities {
    FsCapabilities {
        mandatory_share_locks: cfg!(windows),
    }
}

/// Classify an IO error as a sharing violation.
///
/// Only meaningful on platforms with mandatory share locks; always false
/// elsewhere, so cooperative-locking platforms treat every failure as fatal.
pub fn is_sharing_violation(err: &io::Error) -> bool {
    #[cfg(windows)]
    {
        // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
        matches!(err.raw_os_error(), Some(32) | Some(33))
    }

    #[cfg(not(windows))]
    {
        let _ = err;
        false
    }
}

/// Replace `to` with `from` as a single directory-entry operation.
///
/// # Platform Behavior
/// - **Linux/macOS**: `rename(2)`, atomic over an existing destination.
/// - **Windows**: `ReplaceFileW` with write-through when the destination
///   exists (rename-over-existing fails there), else `MoveFileExW` with
///   replace + write-through flags. Both report sharing violations through
///   `io::Error::raw_os_error`, which the publisher retries.
#[cfg(not(windows))]
pub fn replace_file(from: &Path, to: &Path) -> io::Result<()> {
    std::fs::rename(from, to)
}

#[cfg(windows)]
#[allow(unsafe_code)]
pub fn replace_file(from: &Path, to: &Path) -> io::Result<()> {
    use std::os::windows::ffi::OsStrExt;
    use std::ptr;
    use windows_sys::Win32::Storage::FileSystem::{
        MoveFileExW, ReplaceFileW, MOVEFILE_REPLACE_EXISTING, MOVEFILE_WRITE_THROUGH,
        REPLACEFILE_WRITE_THROUGH,
    };

    fn wide(path: &Path) -> Vec<u16> {
        path.as_os_str().encode_wide().chain(Some(0)).collect()
    }

    const ERROR_FILE_NOT_FOUND: i32 = 2;

    let from_w = wide(from);
    let to_w = wide(to);

    if to.exists() {
        // SAFETY: both strings are NUL-terminated UTF-16 buffers that outlive
        // the call; optional backup/exclusion/reserved arguments are null as
        // documented for ReplaceFileW.
        let ok = unsafe {
            ReplaceFileW(
                to_w.as_ptr(),
                from_w.as_ptr(),
                ptr::null(),
                REPLACEFILE_WRITE_THROUGH,
                ptr::null(),
                ptr::null(),
            )
        };
        if ok != 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        // Destination vanished between the existence check and the call
        // (a racing publisher); fall through to the move path
        if err.raw_os_error() != Some(ERROR_FILE_NOT_FOUND) {
            return Err(err);
        }
    }

    // SAFETY: both strings are NUL-terminated UTF-16 buffers that outlive
    // the call.
    let ok = unsafe {
        MoveFileExW(
            from_w.as_ptr(),
            to_w.as_ptr(),
            MOVEFILE_REPLACE_EXISTING | MOVEFILE_WRITE_THROUGH,
        )
    };

    if ok == 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_capabilities_match_target() {
        assert_eq!(capabilities().mandatory_share_locks, cfg!(windows));
    }

    #[test]
    fn test_generic_errors_are_not_sharing_violations() {
        let err = io::Error::new(io::ErrorKind::NotFound, "missing");
        assert!(!is_sharing_violation(&err));
    }

    #[test]
    fn test_replace_over_existing_file() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("incoming");
        let to = temp.path().join("published");
        fs::write(&from, b"new").unwrap();
        fs::write(&to, b"old").unwrap();

        replace_file(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"new");
    }

    #[test]
    fn test_replace_creates_missing_destination() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("incoming");
        let to = temp.path().join("published");
        fs::write(&from, b"first").unwrap();

        replace_file(&from, &to).unwrap();

        assert_eq!(fs::read(&to).unwrap(), b"first");
    }
}
