//! Error types for the game service.

use std::path::PathBuf;

use hexwar_core::error::GameError;
use thiserror::Error;

/// Result type alias using [`ServiceError`].
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors raised by storage backends and the service decorator.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The move batch or query was rejected by the game rules.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The stored state moved on since it was read. Reload and retry.
    #[error("Version conflict on game '{game_id}': expected {expected}, stored {actual}")]
    VersionConflict {
        /// Game id.
        game_id: String,
        /// Version the caller read.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// No game with this id.
    #[error("Game not found: {0}")]
    GameNotFound(String),

    /// A game with this id already exists.
    #[error("Game already exists: {0}")]
    GameExists(String),

    /// Filesystem failure in the file backend.
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A stored document or config could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A backend lock was poisoned by a panicking writer.
    #[error("Storage lock was poisoned")]
    LockPoisoned,

    /// The request itself is malformed (empty batch, bad id).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ServiceError {
    /// Build an [`ServiceError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether reloading and resubmitting may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}
