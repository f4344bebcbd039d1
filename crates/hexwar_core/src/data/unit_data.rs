//! Unit type definitions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::components::UnitTypeId;
use crate::math::{decimal_serde, Fixed};

/// Movement medium of a unit type.
///
/// Combined with [`UnitDefinition::unit_class`] it forms the key used to look
/// up attack strength (`"Light:Land"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitTerrain {
    /// Ground units.
    #[default]
    Land,
    /// Naval units.
    Water,
    /// Aircraft. Immune to splash damage and only heal at airports.
    Air,
}

impl fmt::Display for UnitTerrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Land => "Land",
            Self::Water => "Water",
            Self::Air => "Air",
        };
        f.write_str(name)
    }
}

/// Data-driven unit type definition.
///
/// # Example RON
///
/// ```ron
/// UnitDefinition(
///     id: 1,
///     name: "Soldier",
///     health: 10,
///     movement_points: 3.0,
///     attack_range: 1,
///     defense: 5,
///     unit_class: "Light",
///     unit_terrain: Land,
///     attack_vs_class: { "Light:Land": 6, "Heavy:Land": 3 },
///     coins: 75,
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitDefinition {
    /// Unique unit type id.
    pub id: UnitTypeId,

    /// Display name.
    pub name: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// Maximum health.
    pub health: u32,

    /// Movement points restored every turn.
    #[serde(with = "decimal_serde")]
    pub movement_points: Fixed,

    /// Maximum hex distance this unit can attack at.
    #[serde(default = "default_attack_range")]
    pub attack_range: u32,

    /// Base defense value used when this unit is attacked.
    #[serde(default)]
    pub defense: i32,

    /// Armor class, e.g. `"Light"`, `"Heavy"`, `"Robot"`.
    #[serde(default = "default_unit_class")]
    pub unit_class: String,

    /// Movement medium.
    #[serde(default)]
    pub unit_terrain: UnitTerrain,

    /// Attack strength against `"class:terrain"` targets. Missing entries
    /// mean this unit cannot hurt that kind of target.
    #[serde(default)]
    pub attack_vs_class: BTreeMap<String, i32>,

    /// Build cost.
    #[serde(default)]
    pub coins: u32,

    /// Ordered action steps; alternatives within a step are `|`-separated.
    #[serde(default = "default_action_order")]
    pub action_order: Vec<String>,

    /// Movement restored when the unit reaches a `retreat` step.
    #[serde(default, with = "decimal_serde")]
    pub retreat_points: Fixed,

    /// Number of splash rolls made against units next to the defender.
    #[serde(default)]
    pub splash_damage: u32,

    /// Repair strength used when fixing adjacent units.
    #[serde(default)]
    pub fix_value: i32,
}

/// Default attack range for units without an explicit one.
const fn default_attack_range() -> u32 {
    1
}

fn default_unit_class() -> String {
    "Light".to_string()
}

/// Default action order: move, then attack or capture.
pub(crate) fn default_action_order() -> Vec<String> {
    vec!["move".to_string(), "attack|capture".to_string()]
}

impl UnitDefinition {
    /// Key other units use to look up their attack against this one.
    #[must_use]
    pub fn class_key(&self) -> String {
        format!("{}:{}", self.unit_class, self.unit_terrain)
    }

    /// Attack strength against `target`, if this unit can hurt it at all.
    #[must_use]
    pub fn attack_against(&self, target: &Self) -> Option<i32> {
        self.attack_vs_class.get(&target.class_key()).copied()
    }

    /// Whether this unit has a splash attack.
    #[must_use]
    pub const fn has_splash(&self) -> bool {
        self.splash_damage > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tank() -> UnitDefinition {
        ron::from_str(
            r#"(
                id: 3,
                name: "Tank",
                health: 10,
                movement_points: 2.5,
                unit_class: "Heavy",
                attack_vs_class: { "Light:Land": 7 },
            )"#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let unit = tank();
        assert_eq!(unit.attack_range, 1);
        assert_eq!(unit.unit_terrain, UnitTerrain::Land);
        assert_eq!(unit.action_order, default_action_order());
        assert_eq!(unit.retreat_points, Fixed::ZERO);
        assert_eq!(unit.movement_points, Fixed::from_num(2.5));
        assert!(!unit.has_splash());
    }

    #[test]
    fn test_attack_against_uses_class_and_terrain() {
        let tank = tank();
        let mut soldier = tank.clone();
        soldier.unit_class = "Light".to_string();
        assert_eq!(soldier.class_key(), "Light:Land");
        assert_eq!(tank.attack_against(&soldier), Some(7));

        soldier.unit_terrain = UnitTerrain::Water;
        assert_eq!(tank.attack_against(&soldier), None);
    }
}
