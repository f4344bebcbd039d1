//! Per-game configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{PlayerId, TerrainTypeId, UnitTypeId};
use crate::error::{GameError, Result};

/// One seat at the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePlayer {
    /// Player id, `1..=N`.
    pub id: PlayerId,
    /// Display name.
    #[serde(default)]
    pub name: String,
}

/// Income overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeConfig {
    /// Per-terrain income; zero or missing falls back to the terrain's own value.
    #[serde(default)]
    pub terrain_income: BTreeMap<TerrainTypeId, u32>,
    /// Flat income every player earns each turn.
    #[serde(default)]
    pub game_income: u32,
}

impl IncomeConfig {
    /// Income for one owned tile, given the terrain's default.
    #[must_use]
    pub fn tile_income(&self, terrain: TerrainTypeId, terrain_default: u32) -> u32 {
        match self.terrain_income.get(&terrain) {
            Some(&income) if income > 0 => income,
            _ => terrain_default,
        }
    }
}

/// Settings fixed when a game is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Players in turn order.
    pub players: Vec<GamePlayer>,
    /// Income settings.
    #[serde(default)]
    pub income: IncomeConfig,
    /// Unit types that may be built; `None` allows everything.
    #[serde(default)]
    pub allowed_units: Option<Vec<UnitTypeId>>,
    /// Coins each player starts with.
    #[serde(default = "default_starting_coins")]
    pub starting_coins: u32,
}

/// Default starting coins.
const fn default_starting_coins() -> u32 {
    300
}

impl GameConfig {
    /// Config for `count` players named `Player 1..N`.
    #[must_use]
    pub fn with_players(count: u32) -> Self {
        Self {
            players: (1..=count)
                .map(|id| GamePlayer {
                    id,
                    name: format!("Player {id}"),
                })
                .collect(),
            income: IncomeConfig::default(),
            allowed_units: None,
            starting_coins: default_starting_coins(),
        }
    }

    /// Number of players.
    #[must_use]
    pub fn num_players(&self) -> u32 {
        u32::try_from(self.players.len()).unwrap_or(u32::MAX)
    }

    /// Allow-list as a slice, if one is set.
    #[must_use]
    pub fn allowed_units(&self) -> Option<&[UnitTypeId]> {
        self.allowed_units.as_deref()
    }

    /// Check that players are numbered `1..=N` in order.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Validation`] if there are no players or the ids are not sequential.
    pub fn validate(&self) -> Result<()> {
        if self.players.is_empty() {
            return Err(GameError::Validation("a game needs at least one player".into()));
        }
        for (expected, player) in (1..).zip(&self.players) {
            if player.id != expected {
                return Err(GameError::Validation(format!(
                    "player ids must be 1..=N in order, found {} at seat {expected}",
                    player.id
                )));
            }
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::with_players(2)
    }
}
