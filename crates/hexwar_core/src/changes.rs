//! World change log entries.
//!
//! Every processed move returns the changes it made as full before/after
//! snapshots, in the order they happened. Clients replay them to stay in
//! sync without re-running the rules; [`crate::game::Game::apply_changes`]
//! does the same on the server side.

use serde::{Deserialize, Serialize};

use crate::components::{PlayerId, TerrainTypeId, Unit};
use crate::coords::AxialCoord;

/// Why a player's coins changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinsReason {
    /// Paid for a new unit.
    Build,
    /// End-of-turn income.
    Income,
}

/// One observable state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldChange {
    /// A unit moved or otherwise changed state without fighting.
    UnitMoved {
        /// Snapshot before.
        previous_unit: Unit,
        /// Snapshot after.
        updated_unit: Unit,
    },
    /// A unit lost health or had its combat state updated.
    UnitDamaged {
        /// Snapshot before.
        previous_unit: Unit,
        /// Snapshot after.
        updated_unit: Unit,
    },
    /// A unit reached zero health and left the map.
    UnitKilled {
        /// Snapshot taken before the fatal damage.
        previous_unit: Unit,
    },
    /// A tile produced a new unit.
    UnitBuilt {
        /// The new unit.
        unit: Unit,
        /// Building tile q.
        tile_q: i32,
        /// Building tile r.
        tile_r: i32,
        /// Coins paid.
        coins_cost: u32,
        /// Coins left afterwards.
        player_coins: u32,
    },
    /// A unit regained health by resting.
    UnitHealed {
        /// Snapshot before.
        previous_unit: Unit,
        /// Snapshot after.
        updated_unit: Unit,
        /// Health restored.
        heal_amount: u32,
    },
    /// A unit took part in a fight without moving or losing health.
    ///
    /// Carries the action bookkeeping (progression, attack history) so a
    /// replay ends in the same state.
    UnitActed {
        /// Snapshot before.
        previous_unit: Unit,
        /// Snapshot after.
        updated_unit: Unit,
    },
    /// The turn passed to another player.
    PlayerChanged {
        /// Player who ended the turn.
        previous_player: PlayerId,
        /// Player now acting.
        new_player: PlayerId,
        /// Turn number before.
        previous_turn: u32,
        /// Turn number after.
        new_turn: u32,
        /// Incoming player's units as they look once refreshed.
        reset_units: Vec<Unit>,
        /// Winner, if this turn change ended the game.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner: Option<PlayerId>,
    },
    /// A player's coin balance changed.
    CoinsChanged {
        /// Player whose balance changed.
        player_id: PlayerId,
        /// Balance before.
        previous_coins: u32,
        /// Balance after.
        new_coins: u32,
        /// Cause.
        reason: CoinsReason,
    },
    /// A unit began capturing a tile.
    CaptureStarted {
        /// Capturing unit after the capture began.
        capturing_unit: Unit,
        /// Tile q.
        tile_q: i32,
        /// Tile r.
        tile_r: i32,
        /// Terrain of the tile.
        tile_type: TerrainTypeId,
        /// Owner at the time the capture began.
        current_owner: PlayerId,
    },
    /// A pending capture completed and the tile changed hands.
    TileCaptured {
        /// Tile q.
        tile_q: i32,
        /// Tile r.
        tile_r: i32,
        /// Owner before.
        previous_owner: PlayerId,
        /// Owner after.
        new_owner: PlayerId,
    },
}

impl WorldChange {
    /// Short name of the variant, as used in the JSON `type` tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnitMoved { .. } => "unit_moved",
            Self::UnitDamaged { .. } => "unit_damaged",
            Self::UnitKilled { .. } => "unit_killed",
            Self::UnitBuilt { .. } => "unit_built",
            Self::UnitHealed { .. } => "unit_healed",
            Self::UnitActed { .. } => "unit_acted",
            Self::PlayerChanged { .. } => "player_changed",
            Self::CoinsChanged { .. } => "coins_changed",
            Self::CaptureStarted { .. } => "capture_started",
            Self::TileCaptured { .. } => "tile_captured",
        }
    }

    /// Hex this change is about, if it concerns a single location.
    #[must_use]
    pub fn coord(&self) -> Option<AxialCoord> {
        match self {
            Self::UnitMoved { updated_unit, .. }
            | Self::UnitDamaged { updated_unit, .. }
            | Self::UnitHealed { updated_unit, .. }
            | Self::UnitActed { updated_unit, .. } => Some(updated_unit.coord()),
            Self::UnitKilled { previous_unit } => Some(previous_unit.coord()),
            Self::UnitBuilt { tile_q, tile_r, .. }
            | Self::CaptureStarted { tile_q, tile_r, .. }
            | Self::TileCaptured { tile_q, tile_r, .. } => Some(AxialCoord::new(*tile_q, *tile_r)),
            Self::PlayerChanged { .. } | Self::CoinsChanged { .. } => None,
        }
    }
}
