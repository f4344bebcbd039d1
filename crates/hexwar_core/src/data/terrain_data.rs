//! Terrain type definitions.

use serde::{Deserialize, Serialize};

use crate::components::{TerrainTypeId, UnitTypeId};

/// Data-driven terrain definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainDefinition {
    /// Unique terrain id.
    pub id: TerrainTypeId,

    /// Display name. `"Airport Base"` is where aircraft heal.
    pub name: String,

    /// Defense bonus used when no terrain/unit entry overrides it.
    #[serde(default)]
    pub defense_bonus: i32,

    /// Unit types that an owned tile of this terrain can build.
    #[serde(default)]
    pub buildable_unit_ids: Vec<UnitTypeId>,

    /// Coins an owned tile of this terrain yields per turn by default.
    #[serde(default)]
    pub income: u32,
}

/// Terrain name on which air units can heal.
pub(crate) const AIRPORT_TERRAIN: &str = "Airport Base";

impl TerrainDefinition {
    /// Whether this terrain can build `unit_type`.
    #[must_use]
    pub fn can_build(&self, unit_type: UnitTypeId) -> bool {
        self.buildable_unit_ids.contains(&unit_type)
    }

    /// Whether this terrain is an airport.
    #[must_use]
    pub fn is_airport(&self) -> bool {
        self.name == AIRPORT_TERRAIN
    }
}
