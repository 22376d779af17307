//! Error types for filekv
//!
//! Provides a unified error type for all store operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for filekv operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // Key Errors
    // -------------------------------------------------------------------------
    #[error("missing key - unable to store data")]
    MissingKey,

    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("key not found: '{key}' (no record at {})", path.display())]
    NotFound { key: String, path: PathBuf },

    // -------------------------------------------------------------------------
    // Filesystem Errors
    // -------------------------------------------------------------------------
    #[error("cannot create directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KvError {
    /// True when a read failed because the record file does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            KvError::NotFound { .. } => true,
            KvError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
