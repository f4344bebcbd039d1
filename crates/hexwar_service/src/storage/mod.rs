//! Storage contracts and backends.
//!
//! [`GameStorageProvider`] covers what gameplay needs: metadata, the
//! versioned state, and the move history. [`GameStateUpdater`] is the narrow
//! path for bookkeeping writes that must not bump the version. Each backend
//! implements both directly; the service composes them.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::InMemoryStorage;

use std::time::{SystemTime, UNIX_EPOCH};

use hexwar_core::state::{GameMoveHistory, GameRecord, GameState, MoveGroup, ScreenshotIndexInfo};

use crate::error::{Result, ServiceError};

/// Persistence for games, their versioned state, and move history.
pub trait GameStorageProvider: Send + Sync {
    /// Store a new game at version 0 with an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::GameExists`] if the id is taken.
    fn create_game(&self, record: &GameRecord, state: &GameState) -> Result<()>;

    /// Metadata and current state.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::GameNotFound`] for an unknown id.
    fn load_game(&self, game_id: &str) -> Result<(GameRecord, GameState)>;

    /// Replace the state if the stored version still equals
    /// `expected_version`, storing it as `expected_version + 1`.
    ///
    /// The version field of `state` is ignored, as is its screenshot
    /// bookkeeping: the stored `last_indexed_at` and `indexed_version` are
    /// kept and `needs_indexing` is raised. Returns the new version.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::VersionConflict`] if another write got there first.
    fn save_game_state(&self, game_id: &str, state: &GameState, expected_version: u64)
        -> Result<u64>;

    /// Remove a game and everything stored with it.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::GameNotFound`] for an unknown id.
    fn delete_game(&self, game_id: &str) -> Result<()>;

    /// Metadata of every stored game, sorted by id.
    fn list_games(&self) -> Result<Vec<GameRecord>>;

    /// Move history of a game.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::GameNotFound`] for an unknown id.
    fn load_history(&self, game_id: &str) -> Result<GameMoveHistory>;

    /// Append a move group to a game's history.
    ///
    /// The group's `group_number` is ignored. The next number is assigned
    /// under the same lock as the append and returned.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::GameNotFound`] for an unknown id.
    fn append_history(&self, game_id: &str, group: &MoveGroup) -> Result<u64>;
}

/// Bookkeeping writes that check the version but never increment it.
pub trait GameStateUpdater: Send + Sync {
    /// Currently stored version.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::GameNotFound`] for an unknown id.
    fn game_state_version(&self, game_id: &str) -> Result<u64>;

    /// Store screenshot indexer bookkeeping.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::VersionConflict`] if the stored version is not
    /// `expected_version`.
    fn update_screenshot_index_info(
        &self,
        game_id: &str,
        expected_version: u64,
        info: &ScreenshotIndexInfo,
    ) -> Result<()>;
}

/// Seconds since the Unix epoch.
#[must_use]
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// State to store on a gameplay save over `stored`.
fn next_state(stored: &GameState, state: &GameState, expected_version: u64) -> GameState {
    let mut next = state.clone();
    next.version = expected_version + 1;
    next.screenshot_index = ScreenshotIndexInfo {
        needs_indexing: true,
        ..stored.screenshot_index.clone()
    };
    next
}

/// Push `group` onto `history` under the next free number.
fn push_group(history: &mut GameMoveHistory, group: &MoveGroup) -> u64 {
    let number = history.next_group_number();
    history.groups.push(MoveGroup {
        group_number: number,
        ..group.clone()
    });
    number
}

fn check_version(game_id: &str, expected: u64, actual: u64) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ServiceError::VersionConflict {
            game_id: game_id.to_string(),
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexwar_test_utils::fixtures::skirmish_game;

    #[test]
    fn test_next_state_keeps_indexer_bookkeeping() {
        let mut stored = skirmish_game(1).to_state();
        stored.screenshot_index = ScreenshotIndexInfo {
            last_indexed_at: Some(10),
            indexed_version: 3,
            needs_indexing: false,
        };
        let mut incoming = skirmish_game(1).to_state();
        incoming.updated_at = 42;
        let next = next_state(&stored, &incoming, 3);
        assert_eq!(next.version, 4);
        assert_eq!(next.updated_at, 42);
        assert_eq!(next.screenshot_index.last_indexed_at, Some(10));
        assert_eq!(next.screenshot_index.indexed_version, 3);
        assert!(next.screenshot_index.needs_indexing);
    }

    #[test]
    fn test_push_group_numbers_in_order() {
        let mut history = GameMoveHistory::new("g");
        let group = MoveGroup {
            group_number: 99,
            player: 1,
            turn: 1,
            version: 1,
            moves: Vec::new(),
            created_at: 0,
        };
        assert_eq!(push_group(&mut history, &group), 1);
        assert_eq!(push_group(&mut history, &group), 2);
        let numbers: Vec<u64> = history.groups.iter().map(|g| g.group_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_check_version() {
        assert!(check_version("g", 2, 2).is_ok());
        let err = check_version("g", 2, 3).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::VersionConflict {
                expected: 2,
                actual: 3,
                ..
            }
        ));
    }
}
