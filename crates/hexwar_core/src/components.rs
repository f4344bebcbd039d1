//! Tiles and units as stored in the world.
//!
//! Both are plain serde structs: the same shape is kept in memory, written to
//! storage, and embedded in [`crate::changes::WorldChange`] snapshots.

use serde::{Deserialize, Serialize};

use crate::coords::AxialCoord;
use crate::math::{decimal_serde, Fixed};

/// Player identifier. `0` is neutral / unowned; real players are `1..=N`.
pub type PlayerId = u32;

/// Unit type identifier (key into the rules' unit table).
pub type UnitTypeId = u32;

/// Terrain type identifier (key into the rules' terrain table).
pub type TerrainTypeId = u32;

/// The neutral player id.
pub const NEUTRAL_PLAYER: PlayerId = 0;

/// One prior attack against a unit this turn, used for wound bonus geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRecord {
    /// Attacker q at the time of the attack.
    pub q: i32,
    /// Attacker r at the time of the attack.
    pub r: i32,
    /// Whether the attacker was two or more hexes away.
    pub is_ranged: bool,
    /// Turn the attack happened on.
    pub turn: u32,
}

impl AttackRecord {
    /// Attacker position.
    #[must_use]
    pub const fn coord(&self) -> AxialCoord {
        AxialCoord::new(self.q, self.r)
    }
}

/// A map cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// Column axis.
    pub q: i32,
    /// Row axis.
    pub r: i32,
    /// Terrain type.
    pub tile_type: TerrainTypeId,
    /// Owning player, [`NEUTRAL_PLAYER`] if unowned.
    #[serde(default)]
    pub player: PlayerId,
    /// Short display label for owned tiles (`A1`).
    #[serde(default)]
    pub shortcut: String,
    /// Turn the tile last built a unit.
    #[serde(default)]
    pub last_acted_turn: u32,
    /// Turn a capture of this tile started, if one is pending.
    #[serde(default)]
    pub capture_started_turn: Option<u32>,
}

impl Tile {
    /// Create an unowned tile.
    #[must_use]
    pub fn new(coord: AxialCoord, tile_type: TerrainTypeId) -> Self {
        Self {
            q: coord.q,
            r: coord.r,
            tile_type,
            player: NEUTRAL_PLAYER,
            shortcut: String::new(),
            last_acted_turn: 0,
            capture_started_turn: None,
        }
    }

    /// Builder-style owner assignment.
    #[must_use]
    pub fn owned_by(mut self, player: PlayerId) -> Self {
        self.player = player;
        self
    }

    /// Tile position.
    #[must_use]
    pub const fn coord(&self) -> AxialCoord {
        AxialCoord::new(self.q, self.r)
    }
}

/// A unit on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Column axis.
    pub q: i32,
    /// Row axis.
    pub r: i32,
    /// Owning player.
    pub player: PlayerId,
    /// Unit type.
    pub unit_type: UnitTypeId,
    /// Short display label (`A1`, `B3`). Assigned by the world if empty.
    #[serde(default)]
    pub shortcut: String,
    /// Remaining health. Zero on a freshly placed unit means "fill on top-up".
    #[serde(default)]
    pub available_health: u32,
    /// Remaining movement points this turn.
    #[serde(default, with = "decimal_serde")]
    pub distance_left: Fixed,
    /// Turn the unit last moved, attacked, captured or healed.
    #[serde(default)]
    pub last_acted_turn: u32,
    /// Turn the unit's budgets were last refreshed.
    #[serde(default)]
    pub last_topped_up_turn: u32,
    /// Number of attacks taken this turn.
    #[serde(default)]
    pub attacks_received_this_turn: u32,
    /// Attacks taken this turn, oldest first.
    #[serde(default)]
    pub attack_history: Vec<AttackRecord>,
    /// Index into the unit type's action order.
    #[serde(default)]
    pub progression_step: u32,
    /// Alternative locked in for the current step (`"attack"` of `"attack|capture"`).
    #[serde(default)]
    pub chosen_alternative: Option<String>,
    /// Turn a capture started on the tile beneath this unit.
    #[serde(default)]
    pub capture_started_turn: Option<u32>,
}

impl Unit {
    /// Create a unit that will be filled to full health and movement on first access.
    #[must_use]
    pub fn new(coord: AxialCoord, player: PlayerId, unit_type: UnitTypeId) -> Self {
        Self {
            q: coord.q,
            r: coord.r,
            player,
            unit_type,
            shortcut: String::new(),
            available_health: 0,
            distance_left: Fixed::ZERO,
            last_acted_turn: 0,
            last_topped_up_turn: 0,
            attacks_received_this_turn: 0,
            attack_history: Vec::new(),
            progression_step: 0,
            chosen_alternative: None,
            capture_started_turn: None,
        }
    }

    /// Builder-style health assignment.
    #[must_use]
    pub fn with_health(mut self, health: u32) -> Self {
        self.available_health = health;
        self
    }

    /// Unit position.
    #[must_use]
    pub const fn coord(&self) -> AxialCoord {
        AxialCoord::new(self.q, self.r)
    }

    /// Set the stored position. Only [`crate::world::World`] should call this.
    pub(crate) fn set_coord(&mut self, coord: AxialCoord) {
        self.q = coord.q;
        self.r = coord.r;
    }
}
