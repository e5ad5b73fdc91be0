//! Error types for CodeMap engine operations.
//!
//! The taxonomy deliberately separates three things a calling layer treats
//! differently:
//!
//! - **Absence** is not an error at the store layer: `get` returns
//!   `Ok(None)` for a missing document or cache entry. Only a query against
//!   an unknown project surfaces as [`Error::ProjectNotFound`].
//! - **Validation** rejects a whole document before anything is persisted.
//! - **Storage** failures abort the operation with no partial result.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The error type for CodeMap engine operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A CodeMap document failed schema validation; nothing was persisted.
    #[error("validation error: {0}")]
    Validation(String),

    /// The requested project has no stored CodeMap.
    #[error("no code map found for project {0:?}")]
    ProjectNotFound(String),

    /// A required operation argument is missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Registration rate limit exceeded for a source IP.
    #[error("rate limit exceeded, retry after {reset_time}")]
    RateLimited {
        /// When the rolling-hour window resets
        reset_time: DateTime<Utc>,
    },

    /// Configuration could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected store failure; the operation was aborted.
    #[error("storage error: {0}")]
    Storage(String),

    /// IO error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A specialized Result type for CodeMap engine operations.
pub type Result<T> = std::result::Result<T, Error>;
