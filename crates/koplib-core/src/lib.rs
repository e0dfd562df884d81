//! Kernel-operation metadata library builder.
//!
//! Scans per-architecture operation-metadata documents emitted by a GPU
//! kernel compiler, folds them into a nested
//! `architecture → operation → datatype → records` index, merges that index
//! with a previously published library, and publishes the result atomically.
//! Many build jobs on different machines may publish into the same artifact
//! directory concurrently; readers always observe either the previous or the
//! new complete library file, never a partial one.
//!
//! # Example
//!
//! ```rust,ignore
//! use koplib_core::{build_library, BuildRequest, DocumentFormat, LibraryFormat};
//!
//! let dest = build_library(&BuildRequest {
//!     src_dir: "build/meta".into(),
//!     co_path: "build/kernels_gfx90a.co".into(),
//!     arch: "gfx90a".to_string(),
//!     input_format: DocumentFormat::Yaml,
//!     output_format: LibraryFormat::Dat,
//!     output_dir: "artifacts".into(),
//!     intermediate: false,
//! })?;
//! println!("published {}", dest.display());
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod format;
pub mod index;
pub mod loader;
pub mod merge;
pub mod platform;
pub mod publish;
pub mod reader;
pub mod reduce;
pub mod retry;

// Re-export commonly used types
pub use builder::{build_library, intermediate_path, library_path, BuildRequest};
pub use config::{ContentionConfig, LibraryConfig};
pub use error::{KoplibError, Result};
pub use format::{decode, encode, DocumentFormat, LibraryFormat};
pub use index::{KernelRecord, LibraryIndex, OpMap, TypeMap};
pub use loader::load_arch_metadata;
pub use merge::{merge, MergePolicy};
pub use publish::publish_library;
pub use reader::read_library;
pub use reduce::{reduce_intermediates, ReduceRequest};
pub use retry::{retry_blocking, RetryConfig, RetryStats};
