//! Error types for whichdist operations.
//!
//! Per-item fetch failures (not found upstream, transient network errors,
//! malformed metadata) are deliberately not part of this enum: they are
//! accumulated by the synchronizer and returned as data, never raised. Only
//! infrastructure failures surface here.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for whichdist.
#[derive(Error, Debug)]
pub enum Error {
    /// Index database unreadable or unwritable. Fatal for the run.
    #[error("index error at {path}: {message}")]
    Index {
        /// Index file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// IO error.
    #[error("io error at {path}: {message}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] sonic_rs::Error),

    /// A requirement line that could not be parsed.
    #[error("invalid requirement on line {line}: {message}")]
    Requirement {
        /// One-based line number.
        line: u32,
        /// Error message.
        message: String,
    },

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Create an IO error with context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create an index infrastructure error with context.
    #[must_use]
    pub fn index(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Index {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for whichdist operations.
pub type Result<T> = std::result::Result<T, Error>;
