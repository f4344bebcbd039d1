//! Persisted game records: metadata, mutable state, and move history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::PlayerId;
use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::moves::MoveResult;
use crate::world::WorldData;

/// Immutable game metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Game id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Settings chosen at creation.
    pub config: GameConfig,
    /// Creation time, seconds since the Unix epoch.
    #[serde(default)]
    pub created_at: u64,
}

/// Per-player balances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Coins available for building.
    pub coins: u32,
}

/// Bookkeeping for the screenshot indexer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotIndexInfo {
    /// When the game was last indexed, seconds since the Unix epoch.
    #[serde(default)]
    pub last_indexed_at: Option<u64>,
    /// State version that was indexed.
    #[serde(default)]
    pub indexed_version: u64,
    /// Whether a fresh screenshot is wanted.
    #[serde(default)]
    pub needs_indexing: bool,
}

/// Mutable game state guarded by an optimistic version counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Owning game.
    pub game_id: String,
    /// Incremented on every successful move save.
    pub version: u64,
    /// Player whose turn it is.
    pub current_player: PlayerId,
    /// Turn number, starting at 1.
    pub turn_counter: u32,
    /// Map contents.
    pub world: WorldData,
    /// Balances by player.
    pub player_states: BTreeMap<PlayerId, PlayerState>,
    /// Whether the game has a winner.
    #[serde(default)]
    pub finished: bool,
    /// Winner, once finished.
    #[serde(default)]
    pub winning_player: Option<PlayerId>,
    /// Seed of the combat RNG.
    pub rng_seed: u64,
    /// Words consumed from the combat RNG stream.
    #[serde(default)]
    pub rng_word_pos: u64,
    /// Screenshot indexer bookkeeping.
    #[serde(default)]
    pub screenshot_index: ScreenshotIndexInfo,
    /// Last write time, seconds since the Unix epoch.
    #[serde(default)]
    pub updated_at: u64,
}

impl GameState {
    /// Encode as a compact binary snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Snapshot`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Snapshot(format!("Failed to serialize game state: {e}")))
    }

    /// Decode a binary snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Snapshot`] if decoding fails.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::Snapshot(format!("Failed to deserialize game state: {e}")))
    }
}

/// Moves submitted together in one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveGroup {
    /// Position of this group in the history, from 1.
    pub group_number: u64,
    /// Player who submitted the batch.
    pub player: PlayerId,
    /// Turn the batch started on.
    pub turn: u32,
    /// State version the batch produced.
    pub version: u64,
    /// Results in order.
    pub moves: Vec<MoveResult>,
    /// Submission time, seconds since the Unix epoch.
    #[serde(default)]
    pub created_at: u64,
}

/// Ordered move groups of one game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameMoveHistory {
    /// Owning game.
    pub game_id: String,
    /// Groups, oldest first.
    #[serde(default)]
    pub groups: Vec<MoveGroup>,
}

impl GameMoveHistory {
    /// Empty history for `game_id`.
    #[must_use]
    pub fn new(game_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            groups: Vec::new(),
        }
    }

    /// Number the next group would get.
    #[must_use]
    pub fn next_group_number(&self) -> u64 {
        self.groups.last().map_or(1, |g| g.group_number + 1)
    }

    /// Total number of recorded moves.
    #[must_use]
    pub fn move_count(&self) -> usize {
        self.groups.iter().map(|g| g.moves.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Tile, Unit};
    use crate::coords::AxialCoord;

    fn sample_state() -> GameState {
        let mut unit = Unit::new(AxialCoord::new(1, 0), 2, 3).with_health(7);
        unit.chosen_alternative = Some("attack".into());
        GameState {
            game_id: "g1".into(),
            version: 4,
            current_player: 2,
            turn_counter: 3,
            world: WorldData {
                name: "snap".into(),
                tiles: vec![
                    Tile::new(AxialCoord::ORIGIN, 1),
                    Tile::new(AxialCoord::new(1, 0), 2).owned_by(2),
                ],
                units: vec![unit],
            },
            player_states: BTreeMap::from([(1, PlayerState { coins: 10 }), (2, PlayerState { coins: 0 })]),
            finished: false,
            winning_player: None,
            rng_seed: 42,
            rng_word_pos: 96,
            screenshot_index: ScreenshotIndexInfo::default(),
            updated_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_binary_snapshot_round_trip() {
        let state = sample_state();
        let bytes = state.to_bytes().unwrap();
        assert_eq!(GameState::from_bytes(&bytes).unwrap(), state);
    }

    #[test]
    fn test_truncated_snapshot_is_rejected() {
        let bytes = sample_state().to_bytes().unwrap();
        assert!(matches!(
            GameState::from_bytes(&bytes[..bytes.len() / 2]),
            Err(GameError::Snapshot(_))
        ));
    }

    #[test]
    fn test_history_numbering() {
        let mut history = GameMoveHistory::new("g1");
        assert_eq!(history.next_group_number(), 1);
        history.groups.push(MoveGroup {
            group_number: 1,
            player: 1,
            turn: 1,
            version: 1,
            moves: Vec::new(),
            created_at: 0,
        });
        assert_eq!(history.next_group_number(), 2);
        assert_eq!(history.move_count(), 0);
    }
}
