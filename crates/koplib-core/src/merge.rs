//! Merge policies for combining library indexes.
//!
//! Shallow models "this run's architecture supersedes the old": each
//! top-level architecture from the incoming index wholesale replaces its
//! entry in the target. Deep models "independent fragments all contribute":
//! the nested maps are merged recursively and leaf record lists concatenate.
//! The asymmetry at the leaves is deliberate and encoding-independent.

use std::collections::btree_map::Entry;
use std::fmt;
use std::str::FromStr;

use crate::error::{KoplibError, Result};
use crate::index::{LibraryIndex, OpMap, TypeMap};

/// Conflict policy applied when two indexes share keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Top-level override: incoming architectures replace existing entries
    /// wholesale; architectures absent from the incoming index are preserved.
    Shallow,
    /// Recursive merge: nested maps combine, leaf record lists concatenate
    /// in existing-then-incoming order, never deduplicated.
    Deep,
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePolicy::Shallow => f.write_str("shallow"),
            MergePolicy::Deep => f.write_str("deep"),
        }
    }
}

impl FromStr for MergePolicy {
    type Err = KoplibError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "shallow" => Ok(MergePolicy::Shallow),
            "deep" => Ok(MergePolicy::Deep),
            other => Err(KoplibError::Config {
                message: format!("Unknown merge policy `{other}` (expected shallow, deep)"),
            }),
        }
    }
}

/// Merge `incoming` into `target` under the given policy.
pub fn merge(target: &mut LibraryIndex, incoming: LibraryIndex, policy: MergePolicy) {
    match policy {
        MergePolicy::Shallow => {
            for (arch, ops) in incoming.arches {
                target.arches.insert(arch, ops);
            }
        }
        MergePolicy::Deep => {
            for (arch, ops) in incoming.arches {
                match target.arches.entry(arch) {
                    Entry::Vacant(slot) => {
                        slot.insert(ops);
                    }
                    Entry::Occupied(mut slot) => merge_ops(slot.get_mut(), ops),
                }
            }
        }
    }
}

fn merge_ops(target: &mut OpMap, incoming: OpMap) {
    for (op, types) in incoming {
        match target.entry(op) {
            Entry::Vacant(slot) => {
                slot.insert(types);
            }
            Entry::Occupied(mut slot) => merge_types(slot.get_mut(), types),
        }
    }
}

fn merge_types(target: &mut TypeMap, incoming: TypeMap) {
    for (io_type, records) in incoming {
        target.entry(io_type).or_default().extend(records);
    }
}
