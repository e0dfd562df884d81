//! Error types for the kernel-operation library builder.
//!
//! Fatal errors (malformed documents, undecodable libraries, environment
//! failures) carry the offending path so CI logs identify the file without
//! re-running. Transient contention is retried by the caller and only
//! surfaces here as [`KoplibError::PersistentContention`] once the retry
//! budget is exhausted.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for library-builder operations.
#[derive(Debug, Error)]
pub enum KoplibError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Metadata document errors
    #[error("Missing required field `{field}` in {path}")]
    MissingField { field: &'static str, path: PathBuf },

    #[error("Invalid metadata document {path}: {message}")]
    InvalidDocument { path: PathBuf, message: String },

    // Library file errors
    #[error("Malformed library file {path}: {message}")]
    MalformedLibrary { path: PathBuf, message: String },

    #[error("Failed to encode library as {format}: {message}")]
    Encode { format: String, message: String },

    // Contention errors
    #[error("Persistent contention: could not {operation} {path} after {attempts} attempts")]
    PersistentContention {
        path: PathBuf,
        operation: &'static str,
        attempts: u32,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias for library-builder operations.
pub type Result<T> = std::result::Result<T, KoplibError>;

impl From<std::io::Error> for KoplibError {
    fn from(err: std::io::Error) -> Self {
        KoplibError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl KoplibError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        KoplibError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// True for errors that indicate cross-process contention exhausted its
    /// retry budget, as opposed to a format or environment failure.
    pub fn is_contention(&self) -> bool {
        matches!(self, KoplibError::PersistentContention { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KoplibError::MissingField {
            field: "arch",
            path: PathBuf::from("gemm_gfx90a.yaml"),
        };
        assert_eq!(
            err.to_string(),
            "Missing required field `arch` in gemm_gfx90a.yaml"
        );
    }

    #[test]
    fn test_contention_classification() {
        let err = KoplibError::PersistentContention {
            path: PathBuf::from("lib.dat"),
            operation: "replace",
            attempts: 120,
        };
        assert!(err.is_contention());
        assert!(!KoplibError::Config {
            message: "bad".into()
        }
        .is_contention());
    }
}
