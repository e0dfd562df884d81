//! Reducer: fold per-architecture intermediate library files into one final
//! library and remove the intermediates.
//!
//! Fragments are decoded, merged (deep by default, so fragments that touch
//! the same architecture contribute to shared buckets instead of clobbering
//! each other), published atomically, and only then deleted. A failed
//! publish leaves every fragment in place so the reduction can be retried
//! without data loss.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::builder::library_path;
use crate::config::LibraryConfig;
use crate::error::{KoplibError, Result};
use crate::format::{self, LibraryFormat};
use crate::index::LibraryIndex;
use crate::merge::{self, MergePolicy};
use crate::publish;
use crate::retry::RetryConfig;

/// Inputs for one reducer invocation.
#[derive(Debug, Clone)]
pub struct ReduceRequest {
    /// Directory holding the intermediate files and the final library.
    pub output_dir: PathBuf,
    /// Encoding of both the intermediates and the final library.
    pub output_format: LibraryFormat,
    /// Merge policy across fragments. Deep is the default; shallow is
    /// available for pipelines that guarantee architecture-disjoint
    /// fragments and want last-writer-wins at the top level.
    pub policy: MergePolicy,
}

/// Merge all intermediates in the output directory into the final library.
///
/// Returns the path of the published library. Finding no intermediates is a
/// fatal configuration error: publishing an empty index would silently
/// replace a previously complete library.
pub fn reduce_intermediates(request: &ReduceRequest) -> Result<PathBuf> {
    let fragments = find_intermediates(&request.output_dir, request.output_format)?;
    if fragments.is_empty() {
        return Err(KoplibError::Config {
            message: format!(
                "No intermediate library files ({}_*.{}) found in {}",
                LibraryConfig::BASENAME,
                request.output_format.extension(),
                request.output_dir.display()
            ),
        });
    }
    info!(
        "Reducing {} intermediate libraries in {}",
        fragments.len(),
        request.output_dir.display()
    );

    let mut combined = LibraryIndex::new();
    for path in &fragments {
        let bytes = fs::read(path).map_err(|e| KoplibError::io_with_path(e, path))?;
        let fragment = format::decode(&bytes, request.output_format).map_err(|message| {
            KoplibError::MalformedLibrary {
                path: path.clone(),
                message,
            }
        })?;
        merge::merge(&mut combined, fragment, request.policy);
    }

    let dest = library_path(&request.output_dir, request.output_format);
    publish::publish_library(&dest, &combined, request.output_format, &RetryConfig::for_replace())?;
    info!(
        "Published {} ({} records from {} fragments)",
        dest.display(),
        combined.record_count(),
        fragments.len()
    );

    // Only after a successful publish are the fragments consumed
    for path in &fragments {
        fs::remove_file(path).map_err(|e| KoplibError::io_with_path(e, path))?;
    }

    Ok(dest)
}

/// Intermediate files `<BASENAME>_*.<ext>` in `dir`, sorted by name.
///
/// Sorted order is not required for correctness (deep merge is commutative
/// for disjoint architectures and concatenation is associative), but keeps
/// shared-bucket concatenation reproducible across runs.
fn find_intermediates(dir: &Path, library_format: LibraryFormat) -> Result<Vec<PathBuf>> {
    let prefix = format!("{}_", LibraryConfig::BASENAME);
    let suffix = format!(".{}", library_format.extension());
    let entries = fs::read_dir(dir).map_err(|e| KoplibError::io_with_path(e, dir))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| KoplibError::io_with_path(e, dir))?;
        let path = entry.path();
        let is_match = path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(&suffix));
        if is_match {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}
