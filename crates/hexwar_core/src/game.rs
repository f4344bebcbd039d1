//! Runtime game: world, turn order, balances, and the combat RNG.
//!
//! A [`Game`] is rebuilt from a [`GameState`] for every request and written
//! back afterwards. Units and tiles are refreshed lazily: the first time a
//! unit is touched in a turn, [`Game::ensure_fresh`] restores its movement,
//! applies resting heal, and resets its per-turn bookkeeping.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::changes::WorldChange;
use crate::components::{PlayerId, Unit};
use crate::config::GameConfig;
use crate::coords::AxialCoord;
use crate::data::{UnitDefinition, UnitTerrain};
use crate::error::{GameError, Result};
use crate::rules::RulesEngine;
use crate::state::{GameState, PlayerState};
use crate::world::World;

/// A game in progress.
#[derive(Debug, Clone)]
pub struct Game {
    id: String,
    config: GameConfig,
    rules: Arc<RulesEngine>,
    pub(crate) world: World,
    pub(crate) current_player: PlayerId,
    pub(crate) turn_counter: u32,
    pub(crate) players: BTreeMap<PlayerId, PlayerState>,
    pub(crate) finished: bool,
    pub(crate) winning_player: Option<PlayerId>,
    rng_seed: u64,
    pub(crate) rng: ChaCha8Rng,
}

impl Game {
    /// Start a new game on `world`. Player 1 moves first on turn 1.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Validation`] for an invalid config.
    pub fn new(
        id: impl Into<String>,
        config: GameConfig,
        rules: Arc<RulesEngine>,
        world: World,
        seed: u64,
    ) -> Result<Self> {
        config.validate()?;
        let players = config
            .players
            .iter()
            .map(|p| {
                (
                    p.id,
                    PlayerState {
                        coins: config.starting_coins,
                    },
                )
            })
            .collect();
        Ok(Self {
            id: id.into(),
            config,
            rules,
            world,
            current_player: 1,
            turn_counter: 1,
            players,
            finished: false,
            winning_player: None,
            rng_seed: seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Rebuild a game from persisted state.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataIntegrity`] if the state is inconsistent with
    /// itself or with the config.
    pub fn from_state(config: GameConfig, rules: Arc<RulesEngine>, state: &GameState) -> Result<Self> {
        config
            .validate()
            .map_err(|e| GameError::DataIntegrity(format!("stored config is invalid: {e}")))?;
        if state.current_player == 0 || state.current_player > config.num_players() {
            return Err(GameError::DataIntegrity(format!(
                "current player {} out of range",
                state.current_player
            )));
        }
        if state.turn_counter == 0 {
            return Err(GameError::DataIntegrity("turn counter must start at 1".into()));
        }
        let world = World::from_data(&state.world)?;
        let mut rng = ChaCha8Rng::seed_from_u64(state.rng_seed);
        rng.set_word_pos(u128::from(state.rng_word_pos));

        Ok(Self {
            id: state.game_id.clone(),
            config,
            rules,
            world,
            current_player: state.current_player,
            turn_counter: state.turn_counter,
            players: state.player_states.clone(),
            finished: state.finished,
            winning_player: state.winning_player,
            rng_seed: state.rng_seed,
            rng,
        })
    }

    /// Fresh persisted state at version 0.
    #[must_use]
    pub fn to_state(&self) -> GameState {
        let mut state = GameState {
            game_id: self.id.clone(),
            version: 0,
            current_player: 0,
            turn_counter: 0,
            world: Default::default(),
            player_states: BTreeMap::new(),
            finished: false,
            winning_player: None,
            rng_seed: self.rng_seed,
            rng_word_pos: 0,
            screenshot_index: Default::default(),
            updated_at: 0,
        };
        self.write_state(&mut state);
        state
    }

    /// Copy the game into `state`, leaving its version and bookkeeping alone.
    pub fn write_state(&self, state: &mut GameState) {
        state.game_id.clone_from(&self.id);
        state.current_player = self.current_player;
        state.turn_counter = self.turn_counter;
        state.world = self.world.to_data();
        state.player_states.clone_from(&self.players);
        state.finished = self.finished;
        state.winning_player = self.winning_player;
        state.rng_seed = self.rng_seed;
        state.rng_word_pos = u64::try_from(self.rng.get_word_pos()).unwrap_or(u64::MAX);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Game id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Game config.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Rule set.
    #[must_use]
    pub fn rules(&self) -> &RulesEngine {
        &self.rules
    }

    /// Shared handle to the rule set.
    #[must_use]
    pub fn rules_handle(&self) -> Arc<RulesEngine> {
        Arc::clone(&self.rules)
    }

    /// The map.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Mutable map, for scenario setup.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Player whose turn it is.
    #[must_use]
    pub const fn current_player(&self) -> PlayerId {
        self.current_player
    }

    /// Current turn number.
    #[must_use]
    pub const fn turn_counter(&self) -> u32 {
        self.turn_counter
    }

    /// Coins held by `player` (zero for unknown players).
    #[must_use]
    pub fn coins(&self, player: PlayerId) -> u32 {
        self.players.get(&player).map_or(0, |p| p.coins)
    }

    /// Set a player's balance, for scenario setup.
    pub fn set_coins(&mut self, player: PlayerId, coins: u32) {
        self.players.entry(player).or_default().coins = coins;
    }

    /// Whether the game has ended.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Winner, once the game has ended.
    #[must_use]
    pub const fn winner(&self) -> Option<PlayerId> {
        self.winning_player
    }

    // ------------------------------------------------------------------
    // Lazy refresh
    // ------------------------------------------------------------------

    /// How `unit` looks once refreshed for the current turn. Pure.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown unit type.
    pub fn refreshed(&self, unit: &Unit) -> Result<Unit> {
        let mut fresh = unit.clone();
        if unit.last_topped_up_turn >= self.turn_counter {
            return Ok(fresh);
        }
        let def = self.rules.unit(unit.unit_type)?;
        fresh.distance_left = def.movement_points;
        if fresh.available_health == 0 {
            fresh.available_health = def.health;
        } else {
            let heal = self.heal_amount(&fresh, def)?;
            fresh.available_health = (fresh.available_health + heal).min(def.health);
        }
        fresh.attack_history.clear();
        fresh.attacks_received_this_turn = 0;
        fresh.progression_step = 0;
        fresh.chosen_alternative = None;
        fresh.last_topped_up_turn = self.turn_counter;
        Ok(fresh)
    }

    /// Refresh the unit at `coord` in place if it has not been this turn.
    ///
    /// Idempotent within a turn.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] if there is no unit there.
    pub fn ensure_fresh(&mut self, coord: AxialCoord) -> Result<()> {
        let unit = self
            .world
            .unit_at(coord)
            .ok_or_else(|| GameError::not_found_at("unit", coord))?;
        if unit.last_topped_up_turn >= self.turn_counter {
            return Ok(());
        }
        let fresh = self.refreshed(unit)?;
        if let Some(slot) = self.world.unit_mut(coord) {
            *slot = fresh;
        }
        Ok(())
    }

    /// Health `unit` would regain by resting this turn.
    ///
    /// Nothing if it acted last turn, stands on an enemy tile, is an aircraft
    /// away from an airport, or the terrain offers no healing.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown terrain.
    pub fn heal_amount(&self, unit: &Unit, def: &UnitDefinition) -> Result<u32> {
        let previous_turn = self.turn_counter.saturating_sub(1).max(1);
        if unit.last_acted_turn >= previous_turn {
            return Ok(0);
        }
        let Some(tile) = self.world.tile_at(unit.coord()) else {
            return Ok(0);
        };
        if RulesEngine::is_enemy_tile(tile, unit.player) {
            return Ok(0);
        }
        if def.unit_terrain == UnitTerrain::Air && !self.rules.terrain(tile.tile_type)?.is_airport() {
            return Ok(0);
        }
        let bonus = self.rules.healing_bonus(tile.tile_type, unit.unit_type);
        Ok(bonus.min(def.health.saturating_sub(unit.available_health)))
    }

    // ------------------------------------------------------------------
    // Turn bookkeeping
    // ------------------------------------------------------------------

    /// The only player in `1..=N` with units left, if there is exactly one.
    #[must_use]
    pub fn check_victory(&self) -> Option<PlayerId> {
        let alive: Vec<PlayerId> = self
            .world
            .players_with_units()
            .into_iter()
            .filter(|p| (1..=self.config.num_players()).contains(p))
            .collect();
        match alive.as_slice() {
            [winner] => Some(*winner),
            _ => None,
        }
    }

    /// Income `player` earns at the end of their turn.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an owned tile with an unknown terrain.
    pub fn income_for(&self, player: PlayerId) -> Result<u32> {
        let mut total = self.config.income.game_income;
        for tile in self.world.tiles() {
            if tile.player != player {
                continue;
            }
            let terrain = self.rules.terrain(tile.tile_type)?;
            total += self.config.income.tile_income(tile.tile_type, terrain.income);
        }
        Ok(total)
    }

    // ------------------------------------------------------------------
    // Change replay
    // ------------------------------------------------------------------

    /// Replay a change log produced by another copy of this game.
    ///
    /// `PlayerChanged` reset snapshots are previews and are not written; the
    /// units refresh lazily here as they did at the source.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataIntegrity`] if a change does not fit the
    /// current world (missing unit, occupied target).
    pub fn apply_changes(&mut self, changes: &[WorldChange]) -> Result<()> {
        for change in changes {
            self.apply_change(change).map_err(|e| {
                GameError::DataIntegrity(format!("cannot apply {}: {e}", change.kind()))
            })?;
        }
        debug!(game_id = %self.id, count = changes.len(), "changes applied");
        Ok(())
    }

    fn apply_change(&mut self, change: &WorldChange) -> Result<()> {
        match change {
            WorldChange::UnitMoved {
                previous_unit,
                updated_unit,
            }
            | WorldChange::UnitDamaged {
                previous_unit,
                updated_unit,
            }
            | WorldChange::UnitHealed {
                previous_unit,
                updated_unit,
                ..
            }
            | WorldChange::UnitActed {
                previous_unit,
                updated_unit,
            } => {
                self.world.remove_unit(previous_unit.coord())?;
                self.world.add_unit(updated_unit.clone())?;
            }
            WorldChange::UnitKilled { previous_unit } => {
                self.world.remove_unit(previous_unit.coord())?;
                if previous_unit.capture_started_turn.is_some() {
                    if let Some(tile) = self.world.tile_mut(previous_unit.coord()) {
                        tile.capture_started_turn = None;
                    }
                }
            }
            WorldChange::UnitBuilt { unit, .. } => {
                self.world.add_unit(unit.clone())?;
                if let Some(tile) = self.world.tile_mut(unit.coord()) {
                    tile.last_acted_turn = unit.last_acted_turn;
                }
            }
            WorldChange::PlayerChanged {
                new_player,
                new_turn,
                winner,
                ..
            } => {
                self.current_player = *new_player;
                self.turn_counter = *new_turn;
                if let Some(winner) = winner {
                    self.finished = true;
                    self.winning_player = Some(*winner);
                }
            }
            WorldChange::CoinsChanged {
                player_id,
                new_coins,
                ..
            } => {
                self.set_coins(*player_id, *new_coins);
            }
            WorldChange::CaptureStarted {
                tile_q,
                tile_r,
                capturing_unit,
                ..
            } => {
                let coord = AxialCoord::new(*tile_q, *tile_r);
                let unit = self
                    .world
                    .unit_mut(coord)
                    .ok_or_else(|| GameError::not_found_at("unit", coord))?;
                *unit = capturing_unit.clone();
                let tile = self
                    .world
                    .tile_mut(coord)
                    .ok_or_else(|| GameError::not_found_at("tile", coord))?;
                tile.capture_started_turn = capturing_unit.capture_started_turn;
            }
            WorldChange::TileCaptured {
                tile_q,
                tile_r,
                new_owner,
                ..
            } => {
                let coord = AxialCoord::new(*tile_q, *tile_r);
                let tile = self
                    .world
                    .tile_mut(coord)
                    .ok_or_else(|| GameError::not_found_at("tile", coord))?;
                tile.player = *new_owner;
                tile.capture_started_turn = None;
                if let Some(unit) = self.world.unit_mut(coord) {
                    unit.capture_started_turn = None;
                }
            }
        }
        Ok(())
    }

    /// Log a finished game.
    pub(crate) fn record_victory(&mut self, winner: PlayerId) {
        self.finished = true;
        self.winning_player = Some(winner);
        info!(game_id = %self.id, winner, turn = self.turn_counter, "game finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Tile;
    use crate::math::Fixed;

    const RULES: &str = r#"(
        units: [
            (id: 1, name: "Soldier", health: 10, movement_points: 3.0),
            (id: 2, name: "Fighter", health: 10, movement_points: 6.0, unit_terrain: Air),
        ],
        terrains: [
            (id: 1, name: "Grass"),
            (id: 2, name: "City", income: 100),
            (id: 3, name: "Airport Base", income: 50),
        ],
        terrain_unit_properties: [
            (terrain_id: 2, unit_id: 1, healing_bonus: 2),
            (terrain_id: 2, unit_id: 2, healing_bonus: 3),
            (terrain_id: 3, unit_id: 2, healing_bonus: 3),
        ],
    )"#;

    fn game() -> Game {
        let rules = Arc::new(RulesEngine::from_ron_str(RULES).unwrap());
        let mut world = World::new("test");
        for coord in AxialCoord::ORIGIN.range(2) {
            world.add_tile(Tile::new(coord, 1));
        }
        world.add_tile(Tile::new(AxialCoord::new(1, 0), 2).owned_by(1));
        world.add_tile(Tile::new(AxialCoord::new(-1, 0), 2).owned_by(2));
        world.add_tile(Tile::new(AxialCoord::new(0, 1), 3).owned_by(1));
        Game::new("g1", GameConfig::with_players(2), rules, world, 7).unwrap()
    }

    #[test]
    fn test_new_unit_fills_on_first_touch() {
        let mut game = game();
        game.world.add_unit(Unit::new(AxialCoord::ORIGIN, 1, 1)).unwrap();
        game.ensure_fresh(AxialCoord::ORIGIN).unwrap();
        let unit = game.world.unit_at(AxialCoord::ORIGIN).unwrap();
        assert_eq!(unit.available_health, 10);
        assert_eq!(unit.distance_left, Fixed::from_num(3));
        assert_eq!(unit.last_topped_up_turn, 1);
    }

    #[test]
    fn test_ensure_fresh_is_idempotent_within_turn() {
        let mut game = game();
        game.world.add_unit(Unit::new(AxialCoord::ORIGIN, 1, 1)).unwrap();
        game.ensure_fresh(AxialCoord::ORIGIN).unwrap();
        game.world.unit_mut(AxialCoord::ORIGIN).unwrap().distance_left = Fixed::ONE;
        game.ensure_fresh(AxialCoord::ORIGIN).unwrap();
        assert_eq!(
            game.world.unit_at(AxialCoord::ORIGIN).unwrap().distance_left,
            Fixed::ONE
        );
    }

    #[test]
    fn test_resting_heal_rules() {
        let mut game = game();
        game.turn_counter = 4;
        let def = game.rules.unit(1).unwrap().clone();

        let mut resting = Unit::new(AxialCoord::new(1, 0), 1, 1).with_health(5);
        resting.last_acted_turn = 2;
        assert_eq!(game.heal_amount(&resting, &def).unwrap(), 2);

        // Acted last turn.
        resting.last_acted_turn = 3;
        assert_eq!(game.heal_amount(&resting, &def).unwrap(), 0);

        // Enemy city.
        let mut behind_lines = Unit::new(AxialCoord::new(-1, 0), 1, 1).with_health(5);
        behind_lines.last_acted_turn = 1;
        assert_eq!(game.heal_amount(&behind_lines, &def).unwrap(), 0);

        // Capped at max health.
        let mut nearly = Unit::new(AxialCoord::new(1, 0), 1, 1).with_health(9);
        nearly.last_acted_turn = 1;
        assert_eq!(game.heal_amount(&nearly, &def).unwrap(), 1);
    }

    #[test]
    fn test_aircraft_only_heal_at_airports() {
        let mut game = game();
        game.turn_counter = 3;
        let def = game.rules.unit(2).unwrap().clone();

        let in_city = Unit::new(AxialCoord::new(1, 0), 1, 2).with_health(4);
        assert_eq!(game.heal_amount(&in_city, &def).unwrap(), 0);

        let at_airport = Unit::new(AxialCoord::new(0, 1), 1, 2).with_health(4);
        assert_eq!(game.heal_amount(&at_airport, &def).unwrap(), 3);
    }

    #[test]
    fn test_refresh_resets_turn_bookkeeping() {
        let mut game = game();
        let mut unit = Unit::new(AxialCoord::ORIGIN, 1, 1).with_health(6);
        unit.progression_step = 2;
        unit.chosen_alternative = Some("attack".into());
        unit.attacks_received_this_turn = 2;
        unit.last_topped_up_turn = 1;
        game.turn_counter = 2;

        let fresh = game.refreshed(&unit).unwrap();
        assert_eq!(fresh.progression_step, 0);
        assert!(fresh.chosen_alternative.is_none());
        assert_eq!(fresh.attacks_received_this_turn, 0);
        assert_eq!(fresh.distance_left, Fixed::from_num(3));
        // Grass offers no healing.
        assert_eq!(fresh.available_health, 6);
    }

    #[test]
    fn test_income_and_victory() {
        let mut game = game();
        assert_eq!(game.income_for(1).unwrap(), 150);
        game.config.income.game_income = 10;
        game.config.income.terrain_income.insert(2, 40);
        assert_eq!(game.income_for(1).unwrap(), 100);

        assert_eq!(game.check_victory(), None);
        game.world.add_unit(Unit::new(AxialCoord::ORIGIN, 2, 1)).unwrap();
        assert_eq!(game.check_victory(), Some(2));
        game.world.add_unit(Unit::new(AxialCoord::new(1, -1), 1, 1)).unwrap();
        assert_eq!(game.check_victory(), None);
    }

    #[test]
    fn test_state_round_trip_preserves_rng_stream() {
        use rand::Rng;

        let mut game = game();
        let _: u64 = game.rng.gen();
        let state = game.to_state();
        let mut restored = Game::from_state(game.config.clone(), game.rules_handle(), &state).unwrap();
        assert_eq!(game.rng.gen::<u64>(), restored.rng.gen::<u64>());
        assert_eq!(restored.coins(1), 300);
        assert_eq!(restored.world().to_data(), game.world().to_data());
    }

    #[test]
    fn test_from_state_rejects_bad_player() {
        let game = game();
        let mut state = game.to_state();
        state.current_player = 3;
        assert!(matches!(
            Game::from_state(game.config.clone(), game.rules_handle(), &state),
            Err(GameError::DataIntegrity(_))
        ));
    }
}
