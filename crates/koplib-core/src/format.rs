//! Interchangeable on-disk encodings for the library index.
//!
//! The three formats differ only in file extension and bytes-vs-text
//! representation; merge and conflict semantics never depend on the chosen
//! encoding. The binary `dat` form uses named-field MessagePack so records
//! round-trip as maps, interchangeable with the text forms.

use std::fmt;
use std::str::FromStr;

use crate::error::{KoplibError, Result};
use crate::index::LibraryIndex;

/// On-disk encoding of a published library file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryFormat {
    /// Compact binary (MessagePack), the default output encoding.
    Dat,
    Yaml,
    Json,
}

impl LibraryFormat {
    /// File extension for this encoding, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            LibraryFormat::Dat => "dat",
            LibraryFormat::Yaml => "yaml",
            LibraryFormat::Json => "json",
        }
    }

    /// True if files in this encoding must be opened in binary mode.
    pub fn is_binary(&self) -> bool {
        matches!(self, LibraryFormat::Dat)
    }
}

impl fmt::Display for LibraryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for LibraryFormat {
    type Err = KoplibError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dat" => Ok(LibraryFormat::Dat),
            "yaml" => Ok(LibraryFormat::Yaml),
            "json" => Ok(LibraryFormat::Json),
            other => Err(KoplibError::Config {
                message: format!("Unknown library format `{other}` (expected dat, yaml, json)"),
            }),
        }
    }
}

/// Encoding of input metadata documents (text forms only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// File extension for this encoding, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Yaml => "yaml",
            DocumentFormat::Json => "json",
        }
    }

    /// Parse one metadata document into a generic JSON value.
    pub fn parse_value(&self, text: &str) -> std::result::Result<serde_json::Value, String> {
        match self {
            DocumentFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            DocumentFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for DocumentFormat {
    type Err = KoplibError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "yaml" => Ok(DocumentFormat::Yaml),
            "json" => Ok(DocumentFormat::Json),
            other => Err(KoplibError::Config {
                message: format!("Unknown input format `{other}` (expected yaml, json)"),
            }),
        }
    }
}

/// Encode an index in the given format.
pub fn encode(index: &LibraryIndex, format: LibraryFormat) -> Result<Vec<u8>> {
    let encode_err = |message: String| KoplibError::Encode {
        format: format.to_string(),
        message,
    };
    match format {
        LibraryFormat::Dat => rmp_serde::to_vec_named(index).map_err(|e| encode_err(e.to_string())),
        LibraryFormat::Yaml => serde_yaml::to_string(index)
            .map(String::into_bytes)
            .map_err(|e| encode_err(e.to_string())),
        LibraryFormat::Json => {
            serde_json::to_vec_pretty(index).map_err(|e| encode_err(e.to_string()))
        }
    }
}

/// Decode an index from bytes in the given format.
///
/// Returns the format's own error message on failure; callers attach the
/// source path via [`KoplibError::MalformedLibrary`].
pub fn decode(bytes: &[u8], format: LibraryFormat) -> std::result::Result<LibraryIndex, String> {
    match format {
        LibraryFormat::Dat => rmp_serde::from_slice(bytes).map_err(|e| e.to_string()),
        LibraryFormat::Yaml => serde_yaml::from_slice(bytes).map_err(|e| e.to_string()),
        LibraryFormat::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
    }
}
