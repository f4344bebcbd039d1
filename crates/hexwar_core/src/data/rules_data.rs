//! Top-level rule set document.

use serde::{Deserialize, Serialize};

use super::{TerrainDefinition, TerrainUnitProperties, UnitDefinition, UnitUnitProperties};

/// Complete rule set as stored in a RON file.
///
/// # Example RON
///
/// ```ron
/// RulesData(
///     units: [ /* UnitDefinition */ ],
///     terrains: [ /* TerrainDefinition */ ],
///     terrain_unit_properties: [ /* TerrainUnitProperties */ ],
///     unit_unit_properties: [ /* UnitUnitProperties */ ],
/// )
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesData {
    /// Unit type definitions.
    #[serde(default)]
    pub units: Vec<UnitDefinition>,

    /// Terrain definitions.
    #[serde(default)]
    pub terrains: Vec<TerrainDefinition>,

    /// Terrain/unit interaction table.
    #[serde(default)]
    pub terrain_unit_properties: Vec<TerrainUnitProperties>,

    /// Which unit types may attack which.
    #[serde(default)]
    pub unit_unit_properties: Vec<UnitUnitProperties>,
}
