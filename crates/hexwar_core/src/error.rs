//! Error types for turn processing.

use thiserror::Error;

use crate::coords::AxialCoord;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all turn-processing errors.
///
/// Every variant except [`GameError::DataIntegrity`] is recoverable: the move
/// batch that produced it is rolled back and the caller may correct the
/// request and try again.
#[derive(Debug, Error)]
pub enum GameError {
    /// A move or query failed a rule check.
    #[error("Invalid move: {0}")]
    Validation(String),

    /// The acting unit or tile does not belong to the player whose turn it is.
    #[error("Not player {player}'s turn (current player is {current})")]
    NotYourTurn {
        /// Owner of the acting unit or tile.
        player: u32,
        /// Player whose turn it is.
        current: u32,
    },

    /// The game already has a winner.
    #[error("Game is finished")]
    GameFinished,

    /// A unit, tile, or definition was looked up and is absent.
    #[error("{what} not found: {key}")]
    NotFound {
        /// Kind of entity that was looked up.
        what: &'static str,
        /// Lookup key rendered for display.
        key: String,
    },

    /// Destination cannot be reached with the remaining movement.
    #[error("{to} is not reachable from {from}")]
    Unreachable {
        /// Source coordinate.
        from: AxialCoord,
        /// Requested destination.
        to: AxialCoord,
    },

    /// Player cannot pay for a build.
    #[error("Insufficient coins: need {required}, have {available}")]
    InsufficientCoins {
        /// Coins required.
        required: u32,
        /// Coins available.
        available: u32,
    },

    /// A required collaborator or definition is missing. Not retried.
    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    /// Failed to read a rules file.
    #[error("Failed to read rules file '{path}': {source}")]
    RulesLoad {
        /// Path to the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a rules document.
    #[error("Failed to parse rules '{path}': {source}")]
    RulesParse {
        /// Path (or `<inline>`) of the document.
        path: String,
        /// Underlying parse error.
        #[source]
        source: ron::error::SpannedError,
    },

    /// Rules parsed but are inconsistent.
    #[error("Rules validation failed: {errors:?}")]
    RulesInvalid {
        /// Every problem found.
        errors: Vec<String>,
    },

    /// Failed to encode or decode a state snapshot.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl GameError {
    /// Build a [`GameError::NotFound`] for a coordinate-keyed entity.
    pub fn not_found_at(what: &'static str, coord: AxialCoord) -> Self {
        Self::NotFound {
            what,
            key: coord.to_string(),
        }
    }

    /// Whether the caller can reasonably retry or correct the request.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::DataIntegrity(_))
    }
}
