//! Error types for FlatKV
//!
//! Provides a unified error type for all operations.
//!
//! Expected outcomes ("key not found" on read, "already exists" on a
//! non-forced write) are never errors: they fold into `Option`/`bool`
//! return values at the store boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using FlatKvError
pub type Result<T> = std::result::Result<T, FlatKvError>;

/// Unified error type for FlatKV operations
#[derive(Debug, Error)]
pub enum FlatKvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Database / Directory Errors
    // -------------------------------------------------------------------------
    #[error("{}: invalid database: {reason}", path.display())]
    InvalidDatabase { path: PathBuf, reason: String },

    #[error("{}: directory unavailable: {reason}", path.display())]
    DirectoryUnavailable { path: PathBuf, reason: String },

    // -------------------------------------------------------------------------
    // Key Errors
    // -------------------------------------------------------------------------
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] glob::PatternError),

    // -------------------------------------------------------------------------
    // Value Errors
    // -------------------------------------------------------------------------
    #[error("Unsupported value type: {0}")]
    UnsupportedType(String),

    #[error("Encoded value too large: {len} bytes (limit {limit})")]
    ValueTooLarge { len: usize, limit: usize },

    #[error("Bad boolean '{0}'")]
    MalformedBoolean(String),

    #[error("Bad number '{0}'")]
    MalformedNumber(String),

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

impl FlatKvError {
    /// True for errors raised while decoding a stored value
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            FlatKvError::MalformedBoolean(_) | FlatKvError::MalformedNumber(_)
        )
    }
}
