//! In-memory backend.

use std::collections::HashMap;
use std::sync::RwLock;

use hexwar_core::state::{GameMoveHistory, GameRecord, GameState, MoveGroup, ScreenshotIndexInfo};
use tracing::debug;

use super::{check_version, next_state, push_group, GameStateUpdater, GameStorageProvider};
use crate::error::{Result, ServiceError};

#[derive(Debug, Clone)]
struct StoredGame {
    record: GameRecord,
    state: GameState,
    history: GameMoveHistory,
}

/// Games held in a process-local map.
///
/// The version check and the write happen under one write lock, so
/// concurrent saves against the same version cannot both succeed.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    games: RwLock<HashMap<String, StoredGame>>,
}

impl InMemoryStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_game<T>(&self, game_id: &str, f: impl FnOnce(&StoredGame) -> T) -> Result<T> {
        let games = self.games.read().map_err(|_| ServiceError::LockPoisoned)?;
        games
            .get(game_id)
            .map(f)
            .ok_or_else(|| ServiceError::GameNotFound(game_id.to_string()))
    }

    fn with_game_mut<T>(
        &self,
        game_id: &str,
        f: impl FnOnce(&mut StoredGame) -> Result<T>,
    ) -> Result<T> {
        let mut games = self.games.write().map_err(|_| ServiceError::LockPoisoned)?;
        let game = games
            .get_mut(game_id)
            .ok_or_else(|| ServiceError::GameNotFound(game_id.to_string()))?;
        f(game)
    }
}

impl GameStorageProvider for InMemoryStorage {
    fn create_game(&self, record: &GameRecord, state: &GameState) -> Result<()> {
        let mut games = self.games.write().map_err(|_| ServiceError::LockPoisoned)?;
        if games.contains_key(&record.id) {
            return Err(ServiceError::GameExists(record.id.clone()));
        }
        let mut state = state.clone();
        state.version = 0;
        games.insert(
            record.id.clone(),
            StoredGame {
                record: record.clone(),
                state,
                history: GameMoveHistory::new(record.id.clone()),
            },
        );
        debug!(game_id = %record.id, "game created");
        Ok(())
    }

    fn load_game(&self, game_id: &str) -> Result<(GameRecord, GameState)> {
        self.with_game(game_id, |g| (g.record.clone(), g.state.clone()))
    }

    fn save_game_state(
        &self,
        game_id: &str,
        state: &GameState,
        expected_version: u64,
    ) -> Result<u64> {
        self.with_game_mut(game_id, |game| {
            check_version(game_id, expected_version, game.state.version)?;
            game.state = next_state(&game.state, state, expected_version);
            Ok(game.state.version)
        })
    }

    fn delete_game(&self, game_id: &str) -> Result<()> {
        let mut games = self.games.write().map_err(|_| ServiceError::LockPoisoned)?;
        games
            .remove(game_id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::GameNotFound(game_id.to_string()))
    }

    fn list_games(&self) -> Result<Vec<GameRecord>> {
        let games = self.games.read().map_err(|_| ServiceError::LockPoisoned)?;
        let mut records: Vec<GameRecord> = games.values().map(|g| g.record.clone()).collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    fn load_history(&self, game_id: &str) -> Result<GameMoveHistory> {
        self.with_game(game_id, |g| g.history.clone())
    }

    fn append_history(&self, game_id: &str, group: &MoveGroup) -> Result<u64> {
        self.with_game_mut(game_id, |game| Ok(push_group(&mut game.history, group)))
    }
}

impl GameStateUpdater for InMemoryStorage {
    fn game_state_version(&self, game_id: &str) -> Result<u64> {
        self.with_game(game_id, |g| g.state.version)
    }

    fn update_screenshot_index_info(
        &self,
        game_id: &str,
        expected_version: u64,
        info: &ScreenshotIndexInfo,
    ) -> Result<()> {
        self.with_game_mut(game_id, |game| {
            check_version(game_id, expected_version, game.state.version)?;
            game.state.screenshot_index = info.clone();
            Ok(())
        })
    }
}
