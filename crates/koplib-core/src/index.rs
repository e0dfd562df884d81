//! In-memory library index: the nested `architecture → operation → datatype →
//! records` mapping at the heart of the builder.
//!
//! Keys are ordered (`BTreeMap`) so that re-encoding an unchanged index is
//! byte-identical across runs. Leaf record lists preserve append order:
//! discovery order within one build, concatenation order across deep merges.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `datatype → ordered kernel records` leaf mapping.
pub type TypeMap = BTreeMap<String, Vec<KernelRecord>>;

/// `operation → datatype` mapping for one architecture.
pub type OpMap = BTreeMap<String, TypeMap>;

/// One kernel's metadata, as stored in a library bucket.
///
/// `io_type` and `co_path` are the fixed fields the builder itself consumes;
/// everything else the compiler emitted passes through opaquely in `extra`.
/// `arch` and `op` are not stored here — they are hoisted into the index keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelRecord {
    /// Data-type signature the kernel operates on.
    pub io_type: String,
    /// Basename of the code-object file containing the kernel.
    pub co_path: String,
    /// Open key-value bag of remaining metadata fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Three-level ordered-key library index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibraryIndex {
    pub arches: BTreeMap<String, OpMap>,
}

impl LibraryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the index holds no architectures at all.
    pub fn is_empty(&self) -> bool {
        self.arches.is_empty()
    }

    /// Append a record to the `(arch, op, io_type)` bucket, creating
    /// intermediate maps as needed.
    pub fn insert_record(
        &mut self,
        arch: impl Into<String>,
        op: impl Into<String>,
        io_type: impl Into<String>,
        record: KernelRecord,
    ) {
        self.arches
            .entry(arch.into())
            .or_default()
            .entry(op.into())
            .or_default()
            .entry(io_type.into())
            .or_default()
            .push(record);
    }

    /// Total number of kernel records across all buckets.
    pub fn record_count(&self) -> usize {
        self.arches
            .values()
            .flat_map(|ops| ops.values())
            .flat_map(|types| types.values())
            .map(|records| records.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(io_type: &str, co_path: &str) -> KernelRecord {
        KernelRecord {
            io_type: io_type.to_string(),
            co_path: co_path.to_string(),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn test_insert_preserves_append_order() {
        let mut index = LibraryIndex::new();
        let mut first = record("f16", "gemm.co");
        first
            .extra
            .insert("tile".to_string(), serde_json::json!(128));
        let mut second = record("f16", "gemm.co");
        second
            .extra
            .insert("tile".to_string(), serde_json::json!(256));

        index.insert_record("gfx90a", "gemm", "f16", first.clone());
        index.insert_record("gfx90a", "gemm", "f16", second.clone());

        let bucket = &index.arches["gfx90a"]["gemm"]["f16"];
        assert_eq!(bucket.as_slice(), &[first, second]);
        assert_eq!(index.record_count(), 2);
    }

    #[test]
    fn test_empty_index() {
        let index = LibraryIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.record_count(), 0);
    }
}
