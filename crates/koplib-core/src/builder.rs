//! Build pipeline: load one architecture's metadata, merge with a previously
//! published library, and publish atomically.
//!
//! Two output modes:
//! - **Final** (default): read-merge-replace against the shared destination.
//!   The current run's architecture entirely replaces any prior entry for
//!   it; other architectures are preserved unchanged (shallow merge).
//! - **Intermediate**: publish a per-architecture fragment for a later
//!   [`crate::reduce`] pass, skipping the read-merge step entirely.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::LibraryConfig;
use crate::error::Result;
use crate::format::{DocumentFormat, LibraryFormat};
use crate::loader;
use crate::merge::{self, MergePolicy};
use crate::publish;
use crate::reader;
use crate::retry::RetryConfig;

/// Inputs for one builder invocation.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Directory containing per-architecture metadata documents.
    pub src_dir: PathBuf,
    /// Path to the compiled code-object file; its basename is embedded in
    /// every record.
    pub co_path: PathBuf,
    /// Target device architecture, e.g. `gfx90a`.
    pub arch: String,
    /// Encoding of the input metadata documents.
    pub input_format: DocumentFormat,
    /// Encoding of the published library file.
    pub output_format: LibraryFormat,
    /// Directory the library file is published into.
    pub output_dir: PathBuf,
    /// Publish a per-architecture intermediate instead of merging into the
    /// final library.
    pub intermediate: bool,
}

/// Path of the final library file in `output_dir`.
pub fn library_path(output_dir: &Path, output_format: LibraryFormat) -> PathBuf {
    output_dir.join(format!(
        "{}.{}",
        LibraryConfig::BASENAME,
        output_format.extension()
    ))
}

/// Path of the per-architecture intermediate file in `output_dir`.
pub fn intermediate_path(output_dir: &Path, arch: &str, output_format: LibraryFormat) -> PathBuf {
    output_dir.join(format!(
        "{}_{}.{}",
        LibraryConfig::BASENAME,
        arch,
        output_format.extension()
    ))
}

/// Run one build: load, merge if a destination exists, publish.
///
/// Returns the path of the published file. Fatal on malformed input, an
/// undecodable existing library, or exhausted contention budgets.
pub fn build_library(request: &BuildRequest) -> Result<PathBuf> {
    info!(
        "Building library for {} from {} (input={}, output={})",
        request.arch,
        request.src_dir.display(),
        request.input_format,
        request.output_format
    );

    let fresh = loader::load_arch_metadata(
        &request.src_dir,
        &request.arch,
        request.input_format,
        &request.co_path,
    )?;
    info!(
        "Loaded {} kernel records for {}",
        fresh.record_count(),
        request.arch
    );

    let dest = if request.intermediate {
        intermediate_path(&request.output_dir, &request.arch, request.output_format)
    } else {
        library_path(&request.output_dir, request.output_format)
    };

    let index = if !request.intermediate && dest.exists() {
        // Read-merge-replace: the previous library is read under the
        // contention budget, then this run's architecture supersedes it
        let mut merged = reader::read_library(&dest, request.output_format, &RetryConfig::for_reads())?;
        info!(
            "Merging into existing library at {} ({} architectures)",
            dest.display(),
            merged.arches.len()
        );
        merge::merge(&mut merged, fresh, MergePolicy::Shallow);
        merged
    } else {
        fresh
    };

    publish::publish_library(&dest, &index, request.output_format, &RetryConfig::for_replace())?;
    info!("Published {}", dest.display());
    Ok(dest)
}
