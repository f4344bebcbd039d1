//! Error types for the tools.

use std::path::PathBuf;

use hexwar_core::error::GameError;
use hexwar_service::error::ServiceError;
use thiserror::Error;

/// Errors surfaced by the command line tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A rule or game operation failed.
    #[error(transparent)]
    Game(#[from] GameError),

    /// A service call failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Reading a file or directory failed.
    #[error("io error at {path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A JSON document could not be parsed or written.
    #[error("json error in {context}: {source}")]
    Json {
        /// What was being parsed.
        context: String,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// One or more rules files failed validation.
    #[error("{failed} of {total} rules files failed validation")]
    ValidationFailed {
        /// Files with errors.
        failed: usize,
        /// Files checked.
        total: usize,
    },
}

/// Result type for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;
