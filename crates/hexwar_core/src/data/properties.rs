//! Pairwise terrain/unit and unit/unit tables.

use serde::{Deserialize, Serialize};

use crate::components::{TerrainTypeId, UnitTypeId};
use crate::math::{option_decimal_serde, Fixed};

/// How one unit type interacts with one terrain type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainUnitProperties {
    /// Terrain id.
    pub terrain_id: TerrainTypeId,

    /// Unit type id.
    pub unit_id: UnitTypeId,

    /// Movement cost to enter; `None` means the default of `1.0`.
    #[serde(default, with = "option_decimal_serde")]
    pub movement_cost: Option<Fixed>,

    /// Added to the unit's attack when attacking from this terrain.
    #[serde(default)]
    pub attack_bonus: i32,

    /// Added to the unit's defense when attacked on this terrain.
    #[serde(default)]
    pub defense_bonus: i32,

    /// Health restored per top-up when resting here.
    #[serde(default)]
    pub healing_bonus: u32,

    /// Whether the unit can capture tiles of this terrain.
    #[serde(default)]
    pub can_capture: bool,

    /// Whether the unit may not enter this terrain at all.
    #[serde(default)]
    pub impassable: bool,
}

impl TerrainUnitProperties {
    /// Movement cost, falling back to one point.
    #[must_use]
    pub fn cost(&self) -> Fixed {
        self.movement_cost.unwrap_or(Fixed::ONE)
    }
}

/// One bucket of a damage distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageRange {
    /// Lower bound (inclusive).
    pub min_value: f64,
    /// Upper bound (inclusive).
    pub max_value: f64,
    /// Fraction of outcomes in this bucket.
    pub probability: f64,
}

/// Outcome distribution of an attack or fix.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DamageDistribution {
    /// Smallest observed outcome.
    pub min_damage: f64,
    /// Largest observed outcome.
    pub max_damage: f64,
    /// Mean outcome.
    pub expected_damage: f64,
    /// Per-value buckets, ascending.
    #[serde(default)]
    pub ranges: Vec<DamageRange>,
}

impl DamageDistribution {
    /// Probability of an outcome of at least `threshold`.
    #[must_use]
    pub fn probability_at_least(&self, threshold: f64) -> f64 {
        self.ranges
            .iter()
            .filter(|range| range.min_value >= threshold)
            .map(|range| range.probability)
            .sum()
    }
}

/// Attacker/defender pairing.
///
/// An entry's presence means the attacker type may attack the defender type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitUnitProperties {
    /// Attacking unit type.
    pub attacker_id: UnitTypeId,

    /// Defending unit type.
    pub defender_id: UnitTypeId,

    /// Optional precomputed base damage for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<DamageDistribution>,
}
