//! Read-only "what can I do here" queries.

use serde::{Deserialize, Serialize};

use crate::combat::{wound_bonus, CombatContext, CombatSimulator};
use crate::components::{PlayerId, TerrainTypeId, Tile, Unit, UnitTypeId};
use crate::coords::AxialCoord;
use crate::data::DamageDistribution;
use crate::error::Result;
use crate::game::Game;
use crate::math::{decimal_serde, Fixed};
use crate::moves::GameMove;
use crate::pathfinding::{reconstruct_path, AllPaths, Path};
use crate::rules::Action;

/// Simulations behind the expected damage shown on attack options.
pub const OPTION_SIMULATIONS: u32 = 200;

/// One thing the current player could do at a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameOption {
    /// Walk to an empty hex.
    Move {
        /// Destination.
        target: AxialCoord,
        /// Cheapest route.
        path: Path,
        /// Movement points the route costs.
        #[serde(with = "decimal_serde")]
        cost: Fixed,
    },
    /// Attack an enemy unit.
    Attack {
        /// Defender position.
        target: AxialCoord,
        /// Mean damage to the defender.
        expected_damage: f64,
        /// Damage spread.
        damage: DamageDistribution,
    },
    /// Start capturing the tile underneath.
    Capture {
        /// Terrain being captured.
        tile_type: TerrainTypeId,
        /// Owner today.
        current_owner: PlayerId,
    },
    /// Rest to regain health.
    Heal {
        /// Health that would be restored.
        amount: u32,
    },
    /// Build a unit on this tile.
    Build {
        /// Unit type.
        unit_type: UnitTypeId,
        /// Price.
        cost: u32,
    },
    /// Pass the turn.
    EndTurn,
}

impl GameOption {
    /// The move that takes this option from `pos`.
    #[must_use]
    pub const fn to_move(&self, pos: AxialCoord) -> GameMove {
        match self {
            Self::Move { target, .. } => GameMove::MoveUnit {
                from: pos,
                to: *target,
            },
            Self::Attack { target, .. } => GameMove::AttackUnit {
                attacker: pos,
                defender: *target,
            },
            Self::Capture { .. } => GameMove::CaptureBuilding { pos },
            Self::Heal { amount } => GameMove::HealUnit {
                pos,
                amount: Some(*amount),
            },
            Self::Build { unit_type, .. } => GameMove::BuildUnit {
                pos,
                unit_type: *unit_type,
            },
            Self::EndTurn => GameMove::EndTurn,
        }
    }
}

/// Everything the current player could do at one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsAt {
    /// Queried position.
    pub position: AxialCoord,
    /// Available options, movement first.
    pub options: Vec<GameOption>,
    /// Movement tree of the unit there, if it can move.
    pub all_paths: Option<AllPaths>,
    /// Player whose turn it is.
    pub current_player: PlayerId,
    /// Unit at the position as it looks this turn.
    pub unit: Option<Unit>,
    /// Tile at the position.
    pub tile: Option<Tile>,
    /// Whether the game has a populated world to query.
    pub initialized: bool,
}

impl OptionsAt {
    /// Whether anything besides ending the turn is possible.
    #[must_use]
    pub fn has_actions(&self) -> bool {
        self.options
            .iter()
            .any(|o| !matches!(o, GameOption::EndTurn))
    }
}

impl Game {
    /// Options for the current player at `pos`. Never mutates the game.
    ///
    /// Units are evaluated as they will look after their lazy refresh, so a
    /// unit untouched this turn already shows its full movement.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::GameError::NotFound`] if the position refers to
    /// unknown unit or terrain types.
    pub fn get_options_at(&self, pos: AxialCoord) -> Result<OptionsAt> {
        let mut out = OptionsAt {
            position: pos,
            options: Vec::new(),
            all_paths: None,
            current_player: self.current_player,
            unit: None,
            tile: self.world.tile_at(pos).cloned(),
            initialized: self.world.tile_count() > 0,
        };
        if self.finished {
            return Ok(out);
        }

        if let Some(stored) = self.world.unit_at(pos) {
            let unit = self.refreshed(stored)?;
            if unit.player == self.current_player {
                self.unit_options(&unit, &mut out)?;
            }
            out.unit = Some(unit);
        } else if let Some(tile) = self.world.tile_at(pos) {
            self.tile_options(tile, &mut out)?;
        }

        out.options.push(GameOption::EndTurn);
        Ok(out)
    }

    fn unit_options(&self, unit: &Unit, out: &mut OptionsAt) -> Result<()> {
        let rules = self.rules();
        let allowed = rules.allowed_actions_with_lookahead(unit)?;
        let pos = unit.coord();

        if allowed.contains(&Action::Move) || allowed.contains(&Action::Retreat) {
            let paths = rules.movement_options(&self.world, unit, unit.distance_left, false)?;
            for target in paths.destinations() {
                let path = reconstruct_path(&paths, target)?;
                let cost = path.total_cost;
                out.options.push(GameOption::Move { target, path, cost });
            }
            out.all_paths = Some(paths);
        }

        if allowed.contains(&Action::Attack) {
            let simulator = CombatSimulator::new(rules);
            for target in rules.attack_options(&self.world, unit)? {
                let Some(stored) = self.world.unit_at(target) else {
                    continue;
                };
                let defender = self.refreshed(stored)?;
                let ctx = CombatContext::between(
                    &self.world,
                    unit,
                    &defender,
                    wound_bonus(&defender, pos),
                )?;
                let Ok(damage) = simulator.damage_distribution(&ctx, OPTION_SIMULATIONS) else {
                    continue;
                };
                out.options.push(GameOption::Attack {
                    target,
                    expected_damage: damage.expected_damage,
                    damage,
                });
            }
        }

        if allowed.contains(&Action::Capture) && unit.capture_started_turn.is_none() {
            if let Some(tile) = self.world.tile_at(pos) {
                if tile.player != unit.player && rules.can_capture(tile.tile_type, unit.unit_type) {
                    out.options.push(GameOption::Capture {
                        tile_type: tile.tile_type,
                        current_owner: tile.player,
                    });
                }
            }
        }

        let def = rules.unit(unit.unit_type)?;
        if unit.available_health < def.health {
            let amount = self.heal_amount(unit, def)?;
            if amount > 0 {
                out.options.push(GameOption::Heal { amount });
            }
        }
        Ok(())
    }

    fn tile_options(&self, tile: &Tile, out: &mut OptionsAt) -> Result<()> {
        if tile.player != self.current_player || tile.last_acted_turn >= self.turn_counter {
            return Ok(());
        }
        let coins = self.coins(self.current_player);
        for def in self
            .rules()
            .buildable_units(tile.tile_type, coins, self.config().allowed_units())?
        {
            out.options.push(GameOption::Build {
                unit_type: def.id,
                cost: def.coins,
            });
        }
        Ok(())
    }
}
