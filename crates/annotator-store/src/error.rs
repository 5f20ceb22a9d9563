//! Error types for the store layer
//!
//! Provides error handling for:
//! - Persistence backends (snapshot read/write/remove)
//! - Import (file → validated experiment)
//! - Export (experiment → file)
//! - Configuration loading

use annotator_schema::{SchemaError, ValidationErrors};
use std::path::PathBuf;

/// Single diagnostic shown for any input that is not JSON
pub const INVALID_JSON_MESSAGE: &str = "Failed to parse JSON file. Please ensure it is valid JSON.";

/// Errors raised by a snapshot backend
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// IO error on the snapshot file
    #[error("io error on snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Experiment could not be encoded
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    /// Backend-specific failure
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl PersistenceError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors during import (ingress)
///
/// Any of these leaves the currently loaded experiment untouched.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Source could not be read
    #[error("io error reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bytes are not UTF-8 JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// JSON does not match the experiment schema
    #[error("validation failed: {0}")]
    Schema(ValidationErrors),
}

impl ImportError {
    /// Create read error for path
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// User-facing diagnostic lines
    ///
    /// Parse failures collapse to one generic line; schema failures list every
    /// violation as `path: message`.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<String> {
        match self {
            Self::Read { path, source } => {
                vec![format!("Failed to read {}: {source}", path.display())]
            }
            Self::InvalidJson(_) => vec![INVALID_JSON_MESSAGE.to_string()],
            Self::Schema(errors) => errors.lines(),
        }
    }
}

impl From<SchemaError> for ImportError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::Parse(msg) => Self::InvalidJson(msg),
            SchemaError::Invalid(errors) => Self::Schema(errors),
        }
    }
}

/// Errors during export (egress)
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Store holds no experiment
    #[error("nothing to export: no experiment loaded")]
    NothingLoaded,

    /// Encoding failed
    #[error("failed to encode experiment: {0}")]
    Encode(#[from] serde_json::Error),

    /// IO error during file write
    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("io error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value passed validation of the format but is unusable
    #[error("invalid config value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Combined store-layer error
#[derive(Debug, thiserror::Error)]
pub enum AnnotatorError {
    /// Snapshot storage failed
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Import failed
    #[error("import error: {0}")]
    Import(#[from] ImportError),

    /// Export failed
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// Configuration unusable
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for store-layer operations
pub type AnnotatorResult<T> = Result<T, AnnotatorError>;
