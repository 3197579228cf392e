// src/error.rs

use thiserror::Error;

/// Core error types for Stowage
#[derive(Error, Debug)]
pub enum Error {
    /// Storage engine errors, message surfaced verbatim
    #[error("catalog engine error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog initialization error
    #[error("failed to initialize catalog: {0}")]
    Init(String),

    /// Input is not a package manifest (missing `@pkg_format_version` header)
    #[error("not a package manifest")]
    NotAManifest,

    /// Invalid caller input
    #[error("invalid argument: {0}")]
    Argument(String),

    /// Invalid search pattern
    #[error("invalid pattern: {0}")]
    Pattern(String),

    /// A query expected a row and found none
    #[error("not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Extended result code reported by the storage engine, when one exists.
    pub fn engine_code(&self) -> Option<i32> {
        match self {
            Error::Database(rusqlite::Error::SqliteFailure(e, _)) => Some(e.extended_code),
            _ => None,
        }
    }
}

/// Result type alias using Stowage's Error type
pub type Result<T> = std::result::Result<T, Error>;
