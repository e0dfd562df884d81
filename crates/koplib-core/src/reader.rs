//! Contention-tolerant reading of an existing library file.
//!
//! On platforms with mandatory share locks, another build job holding the
//! library open makes reads fail with a sharing violation; those are retried
//! with bounded exponential backoff. On cooperative-locking platforms a read
//! failure is never transient, so nothing is retried. Callers check for
//! existence before invoking: a missing file is the caller's branch, not a
//! retry case here.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::error::{KoplibError, Result};
use crate::format::{self, LibraryFormat};
use crate::index::LibraryIndex;
use crate::platform;
use crate::retry::{retry_blocking, RetryConfig};

/// Read and decode the library at `path`, retrying sharing violations.
///
/// Exhausting the retry budget yields [`KoplibError::PersistentContention`],
/// never a silent "file absent". Decode failures are fatal immediately:
/// retrying cannot fix a format error.
pub fn read_library(
    path: &Path,
    library_format: LibraryFormat,
    retry: &RetryConfig,
) -> Result<LibraryIndex> {
    let caps = platform::capabilities();
    read_library_with(path, library_format, retry, |e| {
        caps.mandatory_share_locks && platform::is_sharing_violation(e)
    })
}

/// Read with an explicit transient-failure predicate. The predicate drives
/// both the retry loop and the exhaustion classification, so a failure it
/// still recognizes after the last attempt becomes `PersistentContention`.
fn read_library_with(
    path: &Path,
    library_format: LibraryFormat,
    retry: &RetryConfig,
    is_transient: impl Fn(&io::Error) -> bool,
) -> Result<LibraryIndex> {
    let (read, stats) = retry_blocking(retry, || fs::read(path), &is_transient);

    let bytes = match read {
        Ok(bytes) => bytes,
        Err(e) if is_transient(&e) => {
            return Err(KoplibError::PersistentContention {
                path: path.to_path_buf(),
                operation: "read",
                attempts: stats.attempts,
            });
        }
        Err(e) => return Err(KoplibError::io_with_path(e, path)),
    };

    debug!(
        "Read {} bytes from {} in {} attempt(s)",
        bytes.len(),
        path.display(),
        stats.attempts
    );

    format::decode(&bytes, library_format).map_err(|message| KoplibError::MalformedLibrary {
        path: path.to_path_buf(),
        message,
    })
}
