//! Move dispatch and validation.
//!
//! [`Game::process_move`] validates one [`GameMove`] against the current
//! player, the acting unit's progression, and the rules, applies it to the
//! world, and returns the ordered [`WorldChange`]s it produced. A failed move
//! may leave refreshed units behind but never a partial effect; batches go
//! through [`Game::process_moves`](crate::game::Game::process_moves) so a
//! failure rolls back everything.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::changes::{CoinsReason, WorldChange};
use crate::combat::{wound_bonus, CombatContext, CombatSimulator};
use crate::components::{AttackRecord, PlayerId, Unit, UnitTypeId};
use crate::coords::AxialCoord;
use crate::error::{GameError, Result};
use crate::game::Game;
use crate::math::Fixed;
use crate::rules::{Action, RulesEngine};

/// A player action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameMove {
    /// Walk a unit to an empty hex along the cheapest path.
    MoveUnit {
        /// Unit position.
        from: AxialCoord,
        /// Destination.
        to: AxialCoord,
    },
    /// Attack an enemy unit in range.
    AttackUnit {
        /// Attacking unit position.
        attacker: AxialCoord,
        /// Defending unit position.
        defender: AxialCoord,
    },
    /// Build a unit on an owned tile.
    BuildUnit {
        /// Tile position.
        pos: AxialCoord,
        /// Unit type to build.
        unit_type: UnitTypeId,
    },
    /// Start capturing the tile a unit stands on.
    CaptureBuilding {
        /// Unit and tile position.
        pos: AxialCoord,
    },
    /// Rest a damaged unit.
    HealUnit {
        /// Unit position.
        pos: AxialCoord,
        /// Health to restore; capped at what the terrain allows.
        #[serde(default)]
        amount: Option<u32>,
    },
    /// Pass the turn to the next player.
    EndTurn,
}

impl GameMove {
    /// Short name, as used in the JSON `type` tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MoveUnit { .. } => "move_unit",
            Self::AttackUnit { .. } => "attack_unit",
            Self::BuildUnit { .. } => "build_unit",
            Self::CaptureBuilding { .. } => "capture_building",
            Self::HealUnit { .. } => "heal_unit",
            Self::EndTurn => "end_turn",
        }
    }

    /// Whether a client may not undo this move locally.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::AttackUnit { .. } | Self::BuildUnit { .. })
    }
}

impl fmt::Display for GameMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MoveUnit { from, to } => write!(f, "move {from} -> {to}"),
            Self::AttackUnit { attacker, defender } => write!(f, "attack {attacker} -> {defender}"),
            Self::BuildUnit { pos, unit_type } => write!(f, "build {unit_type} at {pos}"),
            Self::CaptureBuilding { pos } => write!(f, "capture {pos}"),
            Self::HealUnit { pos, .. } => write!(f, "heal {pos}"),
            Self::EndTurn => f.write_str("end turn"),
        }
    }
}

/// Outcome of one processed move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveResult {
    /// The move as submitted.
    pub game_move: GameMove,
    /// Changes in the order they happened.
    pub changes: Vec<WorldChange>,
    /// Whether a client may not undo this move locally.
    pub is_permanent: bool,
    /// Player who made the move.
    pub player: PlayerId,
    /// Turn the move was made on.
    pub turn: u32,
}

impl Game {
    /// Validate and apply a single move.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::GameFinished`] once the game has a winner, and
    /// otherwise whatever check the move fails. See the individual handlers.
    pub fn process_move(&mut self, game_move: &GameMove) -> Result<MoveResult> {
        if self.finished {
            return Err(GameError::GameFinished);
        }
        let player = self.current_player;
        let turn = self.turn_counter;

        let changes = match game_move {
            GameMove::MoveUnit { from, to } => self.move_unit(*from, *to)?,
            GameMove::AttackUnit { attacker, defender } => self.attack_unit(*attacker, *defender)?,
            GameMove::BuildUnit { pos, unit_type } => self.build_unit(*pos, *unit_type)?,
            GameMove::CaptureBuilding { pos } => self.capture_building(*pos)?,
            GameMove::HealUnit { pos, amount } => self.heal_unit(*pos, *amount)?,
            GameMove::EndTurn => self.end_turn()?,
        };

        debug!(
            game_id = %self.id(),
            player,
            turn,
            %game_move,
            changes = changes.len(),
            "move processed"
        );
        Ok(MoveResult {
            game_move: game_move.clone(),
            changes,
            is_permanent: game_move.is_permanent(),
            player,
            turn,
        })
    }

    /// Current player's unit at `coord`, refreshed for this turn.
    fn acting_unit(&mut self, coord: AxialCoord) -> Result<Unit> {
        let owner = self
            .world
            .unit_at(coord)
            .ok_or_else(|| GameError::not_found_at("unit", coord))?
            .player;
        if owner != self.current_player {
            return Err(GameError::NotYourTurn {
                player: owner,
                current: self.current_player,
            });
        }
        self.ensure_fresh(coord)?;
        self.world
            .unit_at(coord)
            .cloned()
            .ok_or_else(|| GameError::not_found_at("unit", coord))
    }

    /// Put `unit` at `step`, forfeiting movement if that skips a step.
    fn enter_step(unit: &mut Unit, step: u32) {
        if step != unit.progression_step {
            unit.progression_step = step;
            unit.chosen_alternative = None;
            unit.distance_left = Fixed::ZERO;
        }
    }

    /// Write `unit` back at its coordinate, or remove it if it has no health left.
    fn store_unit(&mut self, unit: Unit) -> Result<()> {
        let coord = unit.coord();
        if unit.available_health == 0 {
            let removed = self.world.remove_unit(coord)?;
            if removed.capture_started_turn.is_some() {
                if let Some(tile) = self.world.tile_mut(coord) {
                    tile.capture_started_turn = None;
                }
            }
            return Ok(());
        }
        let slot = self
            .world
            .unit_mut(coord)
            .ok_or_else(|| GameError::not_found_at("unit", coord))?;
        *slot = unit;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Handlers
    // ------------------------------------------------------------------

    fn move_unit(&mut self, from: AxialCoord, to: AxialCoord) -> Result<Vec<WorldChange>> {
        let unit = self.acting_unit(from)?;
        if from == to {
            return Err(GameError::Validation(format!(
                "unit {} is already at {to}",
                unit.shortcut
            )));
        }
        let allowed = self.rules().allowed_actions(&unit)?;
        let action = if allowed.contains(&Action::Move) {
            Action::Move
        } else if allowed.contains(&Action::Retreat) {
            Action::Retreat
        } else {
            return Err(GameError::Validation(format!(
                "unit {} cannot move at step {}",
                unit.shortcut, unit.progression_step
            )));
        };
        if self.world.tile_at(to).is_none() {
            return Err(GameError::not_found_at("tile", to));
        }
        if self.world.unit_at(to).is_some() {
            return Err(GameError::Validation(format!("{to} is occupied")));
        }

        let path = self
            .rules()
            .find_path_to(&self.world, &unit, to, unit.distance_left, false)?;

        let mut updated = unit.clone();
        updated.set_coord(to);
        updated.distance_left = (unit.distance_left - path.total_cost).max(Fixed::ZERO);
        updated.last_acted_turn = self.turn_counter;
        self.rules().advance_progression(&mut updated, action)?;

        self.world.move_unit(from, to)?;
        self.store_unit(updated.clone())?;

        Ok(vec![WorldChange::UnitMoved {
            previous_unit: unit,
            updated_unit: updated,
        }])
    }

    fn attack_unit(
        &mut self,
        attacker_at: AxialCoord,
        defender_at: AxialCoord,
    ) -> Result<Vec<WorldChange>> {
        let attacker = self.acting_unit(attacker_at)?;
        self.ensure_fresh(defender_at)?;
        let defender = self
            .world
            .unit_at(defender_at)
            .cloned()
            .ok_or_else(|| GameError::not_found_at("unit", defender_at))?;
        if defender.player == attacker.player {
            return Err(GameError::Validation(format!(
                "unit {} cannot attack a friendly unit",
                attacker.shortcut
            )));
        }

        let rules: Arc<RulesEngine> = self.rules_handle();
        let Some(step) = rules.step_for_action(&attacker, Action::Attack)? else {
            return Err(GameError::Validation(format!(
                "unit {} cannot attack at step {}",
                attacker.shortcut, attacker.progression_step
            )));
        };
        if !rules.can_attack(&attacker, &defender)? {
            return Err(GameError::Validation(format!(
                "unit {} cannot attack {defender_at}",
                attacker.shortcut
            )));
        }

        let simulator = CombatSimulator::new(&rules);
        let ctx = CombatContext::between(
            &self.world,
            &attacker,
            &defender,
            wound_bonus(&defender, attacker_at),
        )?;
        let damage = simulator.simulate_damage(&ctx, &mut self.rng)?;

        let counter = if rules.can_attack(&defender, &attacker)? {
            let ctx = CombatContext::between(&self.world, &defender, &attacker, 0)?;
            match simulator.simulate_damage(&ctx, &mut self.rng) {
                Ok(damage) => damage,
                Err(GameError::Validation(_)) => 0,
                Err(e) => return Err(e),
            }
        } else {
            0
        };

        let turn = self.turn_counter;
        let mut defender_after = defender.clone();
        defender_after.available_health = defender.available_health.saturating_sub(damage);
        defender_after.attack_history.push(AttackRecord {
            q: attacker_at.q,
            r: attacker_at.r,
            is_ranged: attacker_at.distance(defender_at) >= 2,
            turn,
        });
        defender_after.attacks_received_this_turn += 1;

        let mut attacker_after = attacker.clone();
        Self::enter_step(&mut attacker_after, step);
        attacker_after.available_health = attacker.available_health.saturating_sub(counter);
        attacker_after.last_acted_turn = turn;
        rules.advance_progression(&mut attacker_after, Action::Attack)?;

        self.store_unit(defender_after.clone())?;
        self.store_unit(attacker_after.clone())?;

        let defender_killed = defender_after.available_health == 0;
        let attacker_killed = attacker_after.available_health == 0;
        let attacker_alive = !attacker_killed;

        let mut changes = Vec::with_capacity(4);
        changes.push(if damage > 0 {
            WorldChange::UnitDamaged {
                previous_unit: defender.clone(),
                updated_unit: defender_after,
            }
        } else {
            WorldChange::UnitActed {
                previous_unit: defender.clone(),
                updated_unit: defender_after,
            }
        });
        changes.push(if counter > 0 {
            WorldChange::UnitDamaged {
                previous_unit: attacker.clone(),
                updated_unit: attacker_after.clone(),
            }
        } else {
            WorldChange::UnitActed {
                previous_unit: attacker.clone(),
                updated_unit: attacker_after.clone(),
            }
        });
        if defender_killed {
            changes.push(WorldChange::UnitKilled {
                previous_unit: defender,
            });
        }
        if attacker_killed {
            changes.push(WorldChange::UnitKilled {
                previous_unit: attacker,
            });
        }

        if attacker_alive {
            let hits = simulator.splash_damage(&self.world, &attacker_after, defender_at, &mut self.rng)?;
            for (coord, splash) in hits {
                self.ensure_fresh(coord)?;
                let Some(target) = self.world.unit_at(coord).cloned() else {
                    continue;
                };
                let mut hit = target.clone();
                hit.available_health = target.available_health.saturating_sub(splash);
                self.store_unit(hit.clone())?;
                let killed = hit.available_health == 0;
                changes.push(WorldChange::UnitDamaged {
                    previous_unit: target.clone(),
                    updated_unit: hit,
                });
                if killed {
                    changes.push(WorldChange::UnitKilled {
                        previous_unit: target,
                    });
                }
            }
        }

        debug!(
            attacker = %attacker_at,
            defender = %defender_at,
            damage,
            counter,
            defender_killed,
            attacker_killed,
            "attack resolved"
        );
        Ok(changes)
    }

    fn build_unit(&mut self, pos: AxialCoord, unit_type: UnitTypeId) -> Result<Vec<WorldChange>> {
        let player = self.current_player;
        let turn = self.turn_counter;
        let tile = self
            .world
            .tile_at(pos)
            .cloned()
            .ok_or_else(|| GameError::not_found_at("tile", pos))?;
        if tile.player != player {
            return Err(GameError::Validation(format!(
                "tile {pos} is not owned by player {player}"
            )));
        }
        if tile.last_acted_turn >= turn {
            return Err(GameError::Validation(format!(
                "tile {pos} has already built this turn"
            )));
        }
        if self.world.unit_at(pos).is_some() {
            return Err(GameError::Validation(format!("{pos} is occupied")));
        }

        let rules = self.rules_handle();
        let terrain = rules.terrain(tile.tile_type)?;
        if !terrain.can_build(unit_type) {
            return Err(GameError::Validation(format!(
                "{} cannot build unit type {unit_type}",
                terrain.name
            )));
        }
        if self
            .config()
            .allowed_units()
            .is_some_and(|allowed| !allowed.contains(&unit_type))
        {
            return Err(GameError::Validation(format!(
                "unit type {unit_type} is not allowed in this game"
            )));
        }
        let def = rules.unit(unit_type)?;
        let available = self.coins(player);
        if def.coins > available {
            return Err(GameError::InsufficientCoins {
                required: def.coins,
                available,
            });
        }

        let mut unit = Unit::new(pos, player, unit_type).with_health(def.health);
        unit.last_acted_turn = turn;
        unit.last_topped_up_turn = turn;
        rules.exhaust_progression(&mut unit)?;
        self.world.add_unit(unit)?;
        let unit = self
            .world
            .unit_at(pos)
            .cloned()
            .ok_or_else(|| GameError::not_found_at("unit", pos))?;
        if let Some(tile) = self.world.tile_mut(pos) {
            tile.last_acted_turn = turn;
        }

        let remaining = available - def.coins;
        self.set_coins(player, remaining);

        Ok(vec![
            WorldChange::UnitBuilt {
                unit,
                tile_q: pos.q,
                tile_r: pos.r,
                coins_cost: def.coins,
                player_coins: remaining,
            },
            WorldChange::CoinsChanged {
                player_id: player,
                previous_coins: available,
                new_coins: remaining,
                reason: CoinsReason::Build,
            },
        ])
    }

    fn capture_building(&mut self, pos: AxialCoord) -> Result<Vec<WorldChange>> {
        let unit = self.acting_unit(pos)?;
        let tile = self
            .world
            .tile_at(pos)
            .cloned()
            .ok_or_else(|| GameError::not_found_at("tile", pos))?;
        if tile.player == unit.player {
            return Err(GameError::Validation(format!(
                "player {} already owns {pos}",
                unit.player
            )));
        }
        let rules = self.rules_handle();
        if !rules.can_capture(tile.tile_type, unit.unit_type) {
            return Err(GameError::Validation(format!(
                "unit {} cannot capture terrain {}",
                unit.shortcut, tile.tile_type
            )));
        }
        if unit.capture_started_turn.is_some() {
            return Err(GameError::Validation(format!(
                "unit {} is already capturing {pos}",
                unit.shortcut
            )));
        }
        let Some(step) = rules.step_for_action(&unit, Action::Capture)? else {
            return Err(GameError::Validation(format!(
                "unit {} cannot capture at step {}",
                unit.shortcut, unit.progression_step
            )));
        };

        let turn = self.turn_counter;
        let mut updated = unit;
        Self::enter_step(&mut updated, step);
        updated.capture_started_turn = Some(turn);
        updated.last_acted_turn = turn;
        rules.advance_progression(&mut updated, Action::Capture)?;

        self.store_unit(updated.clone())?;
        if let Some(tile) = self.world.tile_mut(pos) {
            tile.capture_started_turn = Some(turn);
        }

        Ok(vec![WorldChange::CaptureStarted {
            capturing_unit: updated,
            tile_q: pos.q,
            tile_r: pos.r,
            tile_type: tile.tile_type,
            current_owner: tile.player,
        }])
    }

    fn heal_unit(&mut self, pos: AxialCoord, amount: Option<u32>) -> Result<Vec<WorldChange>> {
        let unit = self.acting_unit(pos)?;
        let rules = self.rules_handle();
        let def = rules.unit(unit.unit_type)?;
        if unit.available_health >= def.health {
            return Err(GameError::Validation(format!(
                "unit {} is already at full health",
                unit.shortcut
            )));
        }
        let available = self.heal_amount(&unit, def)?;
        let heal = amount.map_or(available, |requested| requested.min(available));
        if heal == 0 {
            return Err(GameError::Validation(format!(
                "unit {} cannot heal at {pos}",
                unit.shortcut
            )));
        }

        let mut updated = unit.clone();
        updated.available_health = (unit.available_health + heal).min(def.health);
        updated.last_acted_turn = self.turn_counter;
        updated.progression_step += 1;
        updated.chosen_alternative = None;
        self.store_unit(updated.clone())?;

        Ok(vec![WorldChange::UnitHealed {
            previous_unit: unit,
            updated_unit: updated,
            heal_amount: heal,
        }])
    }

    fn end_turn(&mut self) -> Result<Vec<WorldChange>> {
        let previous_player = self.current_player;
        let previous_turn = self.turn_counter;
        let mut changes = Vec::new();

        let income = self.income_for(previous_player)?;
        if income > 0 {
            let previous_coins = self.coins(previous_player);
            let new_coins = previous_coins.saturating_add(income);
            self.set_coins(previous_player, new_coins);
            changes.push(WorldChange::CoinsChanged {
                player_id: previous_player,
                previous_coins,
                new_coins,
                reason: CoinsReason::Income,
            });
        }

        let (new_player, new_turn) = if previous_player >= self.config().num_players() {
            (1, previous_turn + 1)
        } else {
            (previous_player + 1, previous_turn)
        };
        self.current_player = new_player;
        self.turn_counter = new_turn;

        let captures = self.complete_captures(new_player, new_turn);

        let reset_units = self
            .world
            .player_units(new_player)
            .into_iter()
            .map(|unit| self.refreshed(unit))
            .collect::<Result<Vec<_>>>()?;

        let winner = self.check_victory();
        if let Some(winner) = winner {
            self.record_victory(winner);
        }

        changes.push(WorldChange::PlayerChanged {
            previous_player,
            new_player,
            previous_turn,
            new_turn,
            reset_units,
            winner,
        });
        changes.extend(captures);

        info!(
            game_id = %self.id(),
            previous_player,
            new_player,
            turn = new_turn,
            "turn passed"
        );
        Ok(changes)
    }

    /// Hand over tiles whose capture by `player` has survived a full round.
    fn complete_captures(&mut self, player: PlayerId, turn: u32) -> Vec<WorldChange> {
        let ready: Vec<(AxialCoord, PlayerId)> = self
            .world
            .tiles()
            .into_iter()
            .filter(|tile| tile.capture_started_turn.is_some_and(|started| started < turn))
            .filter(|tile| {
                self.world.unit_at(tile.coord()).is_some_and(|unit| {
                    unit.player == player && unit.capture_started_turn.is_some()
                })
            })
            .map(|tile| (tile.coord(), tile.player))
            .collect();

        let mut changes = Vec::with_capacity(ready.len());
        for (coord, previous_owner) in ready {
            if let Some(tile) = self.world.tile_mut(coord) {
                tile.player = player;
                tile.capture_started_turn = None;
            }
            if let Some(unit) = self.world.unit_mut(coord) {
                unit.capture_started_turn = None;
            }
            changes.push(WorldChange::TileCaptured {
                tile_q: coord.q,
                tile_r: coord.r,
                previous_owner,
                new_owner: player,
            });
        }
        changes
    }
}
