//! Atomic publication of a library index.
//!
//! Implements the write path so no reader ever observes a zero-length,
//! truncated, or mixed destination file:
//! 1. Encode to a temp file beside the destination (same volume, so the
//!    final step is a metadata-only rename), named with pid + timestamp to
//!    avoid collisions between concurrent publishers
//! 2. Flush and sync the temp file to disk
//! 3. Replace the destination in a single directory-entry operation,
//!    retrying sharing violations on platforms with mandatory share locks
//!
//! A drop guard removes the temp file on any failure path; leftover temps
//! from crashed processes are inert since they never match the destination
//! name.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::config::LibraryConfig;
use crate::error::{KoplibError, Result};
use crate::format::{self, LibraryFormat};
use crate::index::LibraryIndex;
use crate::platform;
use crate::retry::{retry_blocking, RetryConfig};

/// Publish `index` to `dest` atomically.
///
/// At every instant `dest` resolves to either the previous complete library
/// or the new complete library. Succeeds even while other processes hold
/// transient read handles on the destination; gives up with
/// [`KoplibError::PersistentContention`] once the replace budget is spent.
pub fn publish_library(
    dest: &Path,
    index: &LibraryIndex,
    library_format: LibraryFormat,
    retry: &RetryConfig,
) -> Result<()> {
    let caps = platform::capabilities();
    publish_library_with(dest, index, library_format, retry, |e| {
        caps.mandatory_share_locks && platform::is_sharing_violation(e)
    })
}

/// Publish with an explicit transient-failure predicate. The predicate drives
/// both the replace retry loop and the exhaustion classification, so a
/// failure it still recognizes after the last attempt becomes
/// `PersistentContention`.
fn publish_library_with(
    dest: &Path,
    index: &LibraryIndex,
    library_format: LibraryFormat,
    retry: &RetryConfig,
    is_transient: impl Fn(&std::io::Error) -> bool,
) -> Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| KoplibError::io_with_path(e, parent))?;
        }
    }

    let encoded = format::encode(index, library_format)?;
    let temp = TempGuard::new(temp_path(dest));

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp.path())
            .map_err(|e| KoplibError::io_with_path(e, temp.path()))?;

        file.write_all(&encoded)
            .map_err(|e| KoplibError::io_with_path(e, temp.path()))?;
        file.flush()
            .map_err(|e| KoplibError::io_with_path(e, temp.path()))?;
        // Durability sync before the rename becomes visible
        file.sync_all()
            .map_err(|e| KoplibError::io_with_path(e, temp.path()))?;
    }

    let (replaced, stats) = retry_blocking(
        retry,
        || platform::replace_file(temp.path(), dest),
        &is_transient,
    );

    match replaced {
        Ok(()) => {
            temp.commit();
            debug!(
                "Published {} ({} bytes, {} records) in {} attempt(s)",
                dest.display(),
                encoded.len(),
                index.record_count(),
                stats.attempts
            );
            Ok(())
        }
        Err(e) if is_transient(&e) => Err(KoplibError::PersistentContention {
            path: dest.to_path_buf(),
            operation: "replace",
            attempts: stats.attempts,
        }),
        Err(e) => Err(KoplibError::io_with_path(e, dest)),
    }
}

/// Unique temp name beside the destination: `<name>.<pid>.<nanos>.tmp`.
fn temp_path(dest: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(LibraryConfig::BASENAME);
    dest.with_file_name(format!(
        "{}.{}.{}.{}",
        name,
        process::id(),
        nanos,
        LibraryConfig::TEMP_SUFFIX
    ))
}

/// Removes the temp file on drop unless the publish committed.
struct TempGuard {
    path: PathBuf,
    committed: std::cell::Cell<bool>,
}

impl TempGuard {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: std::cell::Cell::new(false),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn commit(&self) {
        self.committed.set(true);
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if !self.committed.get() && self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!(
                    "Could not clean up temp file {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}
