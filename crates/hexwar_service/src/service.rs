//! The games service: stored games in, move results out.
//!
//! [`GamesService`] wraps a storage backend. Each request loads the stored
//! state, rebuilds a [`Game`] against the shared rules, and for move batches
//! writes the result back under the optimistic lock: the save only lands if
//! the stored version is still the one that was read.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use hexwar_core::coords::AxialCoord;
use hexwar_core::game::Game;
use hexwar_core::moves::{GameMove, MoveResult};
use hexwar_core::options::OptionsAt;
use hexwar_core::rules::RulesEngine;
use hexwar_core::state::{GameMoveHistory, GameRecord, GameState, MoveGroup, ScreenshotIndexInfo};
use hexwar_core::world::World;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::attack::{simulate_attack, SimulateAttackRequest, SimulateAttackResponse};
use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::storage::{now_secs, GameStateUpdater, GameStorageProvider};

/// Outcome of a committed move batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessMovesResponse {
    /// Game id.
    pub game_id: String,
    /// One result per submitted move, in order.
    pub results: Vec<MoveResult>,
    /// Stored version after the save.
    pub version: u64,
    /// Player whose turn it is now.
    pub current_player: u32,
    /// Turn number now.
    pub turn_counter: u32,
}

type CachedGame = (GameRecord, GameState);

/// Service over a storage backend.
pub struct GamesService<S> {
    storage: Arc<S>,
    rules: Arc<RulesEngine>,
    config: ServiceConfig,
    cache: Option<RwLock<HashMap<String, CachedGame>>>,
}

impl<S> std::fmt::Debug for GamesService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GamesService")
            .field("config", &self.config)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: GameStorageProvider + GameStateUpdater> GamesService<S> {
    /// Service over `storage` using `rules` for every game.
    pub fn new(storage: Arc<S>, rules: Arc<RulesEngine>, config: ServiceConfig) -> Self {
        let cache = config.cache_games.then(|| RwLock::new(HashMap::new()));
        Self {
            storage,
            rules,
            config,
            cache,
        }
    }

    /// The backend.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Shared rules.
    #[must_use]
    pub fn rules(&self) -> &Arc<RulesEngine> {
        &self.rules
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Cache
    // ------------------------------------------------------------------

    fn load_stored(&self, game_id: &str) -> Result<CachedGame> {
        if let Some(cache) = &self.cache {
            let cached = cache.read().map_err(|_| ServiceError::LockPoisoned)?;
            if let Some(entry) = cached.get(game_id) {
                debug!(game_id, "cache hit");
                return Ok(entry.clone());
            }
        }
        let loaded = self.storage.load_game(game_id)?;
        if let Some(cache) = &self.cache {
            cache
                .write()
                .map_err(|_| ServiceError::LockPoisoned)?
                .insert(game_id.to_string(), loaded.clone());
        }
        Ok(loaded)
    }

    fn invalidate(&self, game_id: &str) -> Result<()> {
        if let Some(cache) = &self.cache {
            cache
                .write()
                .map_err(|_| ServiceError::LockPoisoned)?
                .remove(game_id);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Games
    // ------------------------------------------------------------------

    /// Create a game on `world` and store it at version 0.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Game`] for an invalid config and
    /// [`ServiceError::GameExists`] if the id is taken.
    pub fn create_game(&self, mut record: GameRecord, world: World, seed: u64) -> Result<GameState> {
        let game = Game::new(
            record.id.clone(),
            record.config.clone(),
            Arc::clone(&self.rules),
            world,
            seed,
        )?;
        let now = now_secs();
        if record.created_at == 0 {
            record.created_at = now;
        }
        let mut state = game.to_state();
        state.updated_at = now;
        state.screenshot_index.needs_indexing = true;
        self.storage.create_game(&record, &state)?;
        info!(game_id = %record.id, players = record.config.num_players(), "game created");
        Ok(state)
    }

    /// Rebuild the runtime game and return it with the state it came from.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::GameNotFound`] for an unknown id and
    /// [`ServiceError::Game`] if the stored state is inconsistent.
    pub fn load_game(&self, game_id: &str) -> Result<(Game, GameState)> {
        let (record, state) = self.load_stored(game_id)?;
        let game = Game::from_state(record.config, Arc::clone(&self.rules), &state)?;
        Ok((game, state))
    }

    /// Metadata of every stored game.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn list_games(&self) -> Result<Vec<GameRecord>> {
        self.storage.list_games()
    }

    /// Move history of a game.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::GameNotFound`] for an unknown id.
    pub fn history(&self, game_id: &str) -> Result<GameMoveHistory> {
        self.storage.load_history(game_id)
    }

    /// Remove a game.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::GameNotFound`] for an unknown id.
    pub fn delete_game(&self, game_id: &str) -> Result<()> {
        self.invalidate(game_id)?;
        self.storage.delete_game(game_id)
    }

    // ------------------------------------------------------------------
    // Moves
    // ------------------------------------------------------------------

    /// Apply a batch of moves to a stored game, all or nothing.
    ///
    /// On success the new state is saved at the next version and the batch is
    /// appended to the history as one group.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidRequest`] for an empty batch.
    /// - [`ServiceError::Game`] if any move is rejected; nothing is stored.
    /// - [`ServiceError::VersionConflict`] if another write landed first;
    ///   reload and retry.
    pub fn process_moves(&self, game_id: &str, moves: &[GameMove]) -> Result<ProcessMovesResponse> {
        if moves.is_empty() {
            return Err(ServiceError::InvalidRequest("no moves submitted".into()));
        }
        let (mut game, mut state) = self.load_game(game_id)?;
        let expected_version = state.version;
        let player = game.current_player();
        let turn = game.turn_counter();

        let results = game.process_moves(moves)?;

        let now = now_secs();
        game.write_state(&mut state);
        state.updated_at = now;

        let saved = self.storage.save_game_state(game_id, &state, expected_version);
        self.invalidate(game_id)?;
        let version = match saved {
            Ok(version) => version,
            Err(err) => {
                warn!(game_id, expected_version, error = %err, "move batch not saved");
                return Err(err);
            }
        };

        let group = MoveGroup {
            group_number: 0,
            player,
            turn,
            version,
            moves: results.clone(),
            created_at: now,
        };
        let group_number = self.storage.append_history(game_id, &group)?;

        info!(
            game_id,
            version,
            group_number,
            moves = results.len(),
            current_player = game.current_player(),
            turn = game.turn_counter(),
            "move batch saved"
        );
        Ok(ProcessMovesResponse {
            game_id: game_id.to_string(),
            results,
            version,
            current_player: game.current_player(),
            turn_counter: game.turn_counter(),
        })
    }

    /// Options at `pos` in a stored game. Never writes.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::GameNotFound`] for an unknown id.
    pub fn get_options_at(&self, game_id: &str, pos: AxialCoord) -> Result<OptionsAt> {
        let (game, _) = self.load_game(game_id)?;
        Ok(game.get_options_at(pos)?)
    }

    /// Simulate an attack between two unit types; touches no game.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Game`] if the attacker cannot hit the defender.
    pub fn simulate_attack(&self, request: &SimulateAttackRequest) -> Result<SimulateAttackResponse> {
        simulate_attack(&self.rules, request, self.config.default_simulations)
    }

    // ------------------------------------------------------------------
    // Bookkeeping
    // ------------------------------------------------------------------

    /// Record screenshot indexing without bumping the version.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::VersionConflict`] if the game moved on since
    /// `expected_version` was read.
    pub fn update_screenshot_index_info(
        &self,
        game_id: &str,
        expected_version: u64,
        info: &ScreenshotIndexInfo,
    ) -> Result<()> {
        self.invalidate(game_id)?;
        self.storage
            .update_screenshot_index_info(game_id, expected_version, info)?;
        debug!(game_id, expected_version, "screenshot index updated");
        Ok(())
    }
}
