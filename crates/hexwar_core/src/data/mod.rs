//! Data structures for rule set configuration.
//!
//! This module contains pure data structures that define unit types,
//! terrains, and the pairwise terrain/unit and unit/unit tables. All structs
//! are designed to be deserialized from RON files.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading lives on [`crate::rules::RulesEngine`].

mod properties;
mod rules_data;
mod terrain_data;
mod unit_data;

pub use properties::{DamageDistribution, DamageRange, TerrainUnitProperties, UnitUnitProperties};
pub use rules_data::RulesData;
pub use terrain_data::TerrainDefinition;
pub use unit_data::{UnitDefinition, UnitTerrain};
