//! Metadata loader: folds per-architecture operation-metadata documents into
//! a library index.
//!
//! Documents are matched by filename suffix (`*<arch>.<ext>`) and processed
//! in sorted filename order, so unchanged inputs produce byte-identical
//! record ordering on every run. A document missing a required field fails
//! the whole run: no partial library is better than a silently incomplete
//! one.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{KoplibError, Result};
use crate::format::DocumentFormat;
use crate::index::{KernelRecord, LibraryIndex};

/// Required fields of every metadata document.
const FIELD_ARCH: &str = "arch";
const FIELD_OP: &str = "op";
const FIELD_IO_TYPE: &str = "io_type";
const FIELD_CO_PATH: &str = "co_path";

/// Load every metadata document for `arch` from `src_dir` into an index.
///
/// `co_path` is the compiled code-object the documents belong to; only its
/// basename is embedded in records, keeping the published library
/// location-independent.
pub fn load_arch_metadata(
    src_dir: &Path,
    arch: &str,
    input_format: DocumentFormat,
    co_path: &Path,
) -> Result<LibraryIndex> {
    let co_basename = co_basename(co_path)?;
    let documents = matching_documents(src_dir, arch, input_format)?;
    info!(
        "Found {} metadata documents for {} in {}",
        documents.len(),
        arch,
        src_dir.display()
    );

    let mut index = LibraryIndex::new();
    for path in &documents {
        let record = load_document(path, input_format, &co_basename)?;
        debug!(
            "Loaded {}: arch={}, op={}, io_type={}",
            path.display(),
            record.arch,
            record.op,
            record.record.io_type
        );
        index.insert_record(record.arch, record.op, record.record.io_type.clone(), record.record);
    }

    Ok(index)
}

struct LoadedDocument {
    arch: String,
    op: String,
    record: KernelRecord,
}

/// Files in `src_dir` whose names end in `<arch>.<ext>`, sorted by name.
fn matching_documents(
    src_dir: &Path,
    arch: &str,
    input_format: DocumentFormat,
) -> Result<Vec<PathBuf>> {
    let suffix = format!("{}.{}", arch, input_format.extension());
    let entries =
        fs::read_dir(src_dir).map_err(|e| KoplibError::io_with_path(e, src_dir))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| KoplibError::io_with_path(e, src_dir))?;
        let path = entry.path();
        let is_match = path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(&suffix));
        if is_match {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

fn load_document(
    path: &Path,
    input_format: DocumentFormat,
    co_basename: &str,
) -> Result<LoadedDocument> {
    let text = fs::read_to_string(path).map_err(|e| KoplibError::io_with_path(e, path))?;
    let value = input_format
        .parse_value(&text)
        .map_err(|message| KoplibError::InvalidDocument {
            path: path.to_path_buf(),
            message,
        })?;

    let serde_json::Value::Object(fields) = value else {
        return Err(KoplibError::InvalidDocument {
            path: path.to_path_buf(),
            message: "document is not a mapping".to_string(),
        });
    };
    let mut fields: BTreeMap<String, serde_json::Value> = fields.into_iter().collect();

    // Required fields are extracted explicitly; everything else passes
    // through opaquely in the record's key-value bag.
    let arch = take_string(&mut fields, FIELD_ARCH, path)?;
    let op = take_string(&mut fields, FIELD_OP, path)?;
    let io_type = take_string(&mut fields, FIELD_IO_TYPE, path)?;
    fields.remove(FIELD_CO_PATH);

    Ok(LoadedDocument {
        arch,
        op,
        record: KernelRecord {
            io_type,
            co_path: co_basename.to_string(),
            extra: fields,
        },
    })
}

fn take_string(
    fields: &mut BTreeMap<String, serde_json::Value>,
    field: &'static str,
    path: &Path,
) -> Result<String> {
    match fields.remove(field) {
        Some(serde_json::Value::String(s)) => Ok(s),
        Some(other) => Err(KoplibError::InvalidDocument {
            path: path.to_path_buf(),
            message: format!("field `{field}` must be a string, got {other}"),
        }),
        None => Err(KoplibError::MissingField { field, path: path.to_path_buf() }),
    }
}

fn co_basename(co_path: &Path) -> Result<String> {
    co_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| KoplibError::Config {
            message: format!(
                "Code-object path has no basename: {}",
                co_path.display()
            ),
        })
}
