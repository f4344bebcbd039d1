//! Rule set lookups and per-unit action progression.
//!
//! [`RulesEngine`] owns the unit, terrain, and pairwise tables loaded from a
//! [`RulesData`] document. It answers pure questions: what a move costs, who
//! may attack whom, and which actions a unit may still take this turn. The
//! movement solver lives in [`crate::pathfinding`] as a second `impl` block.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::components::{PlayerId, TerrainTypeId, Tile, Unit, UnitTypeId};
use crate::coords::AxialCoord;
use crate::data::{
    RulesData, TerrainDefinition, TerrainUnitProperties, UnitDefinition, UnitUnitProperties,
};
use crate::error::{GameError, Result};
use crate::math::Fixed;
use crate::world::World;

/// A kind of action a unit or tile can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// Spend movement points.
    Move,
    /// Spend retreat points after attacking.
    Retreat,
    /// Attack an enemy unit.
    Attack,
    /// Start capturing the tile underneath.
    Capture,
    /// Build a unit on an owned tile.
    Build,
    /// Repair an adjacent friendly unit.
    Fix,
}

impl Action {
    /// Name as written in action orders.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Retreat => "retreat",
            Self::Attack => "attack",
            Self::Capture => "capture",
            Self::Build => "build",
            Self::Fix => "fix",
        }
    }

    /// Whether this action is metered by movement points.
    #[must_use]
    pub const fn is_point_based(self) -> bool {
        matches!(self, Self::Move | Self::Retreat)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "move" => Ok(Self::Move),
            "retreat" => Ok(Self::Retreat),
            "attack" => Ok(Self::Attack),
            "capture" => Ok(Self::Capture),
            "build" => Ok(Self::Build),
            "fix" => Ok(Self::Fix),
            other => Err(GameError::Validation(format!("unknown action '{other}'"))),
        }
    }
}

/// One step of an action order: the alternatives allowed at that step.
pub type ActionStep = Vec<Action>;

/// Parse `"attack|capture"` into its alternatives.
///
/// # Errors
///
/// Returns [`GameError::Validation`] for an empty step or an unknown name.
pub fn parse_step(step: &str) -> Result<ActionStep> {
    let actions = step
        .split('|')
        .map(str::parse)
        .collect::<Result<ActionStep>>()?;
    if actions.is_empty() {
        return Err(GameError::Validation("empty action step".to_string()));
    }
    Ok(actions)
}

/// Lookup tables and rule queries for one rule set.
#[derive(Debug, Clone)]
pub struct RulesEngine {
    units: BTreeMap<UnitTypeId, UnitDefinition>,
    terrains: BTreeMap<TerrainTypeId, TerrainDefinition>,
    terrain_unit: HashMap<(TerrainTypeId, UnitTypeId), TerrainUnitProperties>,
    unit_unit: HashMap<(UnitTypeId, UnitTypeId), UnitUnitProperties>,
    action_orders: HashMap<UnitTypeId, Vec<ActionStep>>,
}

impl RulesEngine {
    /// Build an engine from parsed data and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RulesInvalid`] listing every inconsistency found.
    pub fn from_data(data: RulesData) -> Result<Self> {
        let mut errors = Vec::new();

        let mut units = BTreeMap::new();
        for unit in data.units {
            if let Some(previous) = units.insert(unit.id, unit) {
                errors.push(format!("duplicate unit id {}", previous.id));
            }
        }
        let mut terrains = BTreeMap::new();
        for terrain in data.terrains {
            if let Some(previous) = terrains.insert(terrain.id, terrain) {
                errors.push(format!("duplicate terrain id {}", previous.id));
            }
        }
        let mut terrain_unit = HashMap::new();
        for props in data.terrain_unit_properties {
            let key = (props.terrain_id, props.unit_id);
            if terrain_unit.insert(key, props).is_some() {
                errors.push(format!("duplicate terrain/unit entry {}:{}", key.0, key.1));
            }
        }
        let mut unit_unit = HashMap::new();
        for props in data.unit_unit_properties {
            let key = (props.attacker_id, props.defender_id);
            if unit_unit.insert(key, props).is_some() {
                errors.push(format!("duplicate unit/unit entry {}:{}", key.0, key.1));
            }
        }

        let mut action_orders = HashMap::new();
        for unit in units.values() {
            match unit
                .action_order
                .iter()
                .map(|s| parse_step(s))
                .collect::<Result<Vec<_>>>()
            {
                Ok(steps) => {
                    action_orders.insert(unit.id, steps);
                }
                Err(e) => errors.push(format!("unit {} action order: {e}", unit.id)),
            }
        }

        let engine = Self {
            units,
            terrains,
            terrain_unit,
            unit_unit,
            action_orders,
        };
        errors.extend(engine.collect_errors());
        if !errors.is_empty() {
            return Err(GameError::RulesInvalid { errors });
        }

        debug!(
            units = engine.units.len(),
            terrains = engine.terrains.len(),
            "rules loaded"
        );
        Ok(engine)
    }

    /// Parse and validate a RON rules document.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RulesParse`] or [`GameError::RulesInvalid`].
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let data: RulesData = ron::from_str(source).map_err(|source| GameError::RulesParse {
            path: "<inline>".to_string(),
            source,
        })?;
        Self::from_data(data)
    }

    /// Load and validate a RON rules file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RulesLoad`] if the file cannot be read, otherwise
    /// as [`Self::from_ron_str`].
    pub fn load_ron_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let source = std::fs::read_to_string(path).map_err(|source| GameError::RulesLoad {
            path: display.clone(),
            source,
        })?;
        let data: RulesData = ron::from_str(&source).map_err(|source| GameError::RulesParse {
            path: display,
            source,
        })?;
        Self::from_data(data)
    }

    /// Re-run the consistency checks.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RulesInvalid`] if any check fails.
    pub fn validate(&self) -> Result<()> {
        let errors = self.collect_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GameError::RulesInvalid { errors })
        }
    }

    fn collect_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.units.is_empty() {
            errors.push("no unit definitions".to_string());
        }
        if self.terrains.is_empty() {
            errors.push("no terrain definitions".to_string());
        }
        for unit in self.units.values() {
            if unit.health == 0 {
                errors.push(format!("unit {} has zero health", unit.id));
            }
            if unit.movement_points < Fixed::ZERO {
                errors.push(format!("unit {} has negative movement", unit.id));
            }
            if unit.action_order.is_empty() {
                errors.push(format!("unit {} has an empty action order", unit.id));
            }
        }
        for terrain in self.terrains.values() {
            for id in &terrain.buildable_unit_ids {
                if !self.units.contains_key(id) {
                    errors.push(format!(
                        "terrain {} builds unknown unit {id}",
                        terrain.id
                    ));
                }
            }
        }
        for (terrain_id, unit_id) in self.terrain_unit.keys() {
            if !self.terrains.contains_key(terrain_id) {
                errors.push(format!("terrain/unit entry references terrain {terrain_id}"));
            }
            if !self.units.contains_key(unit_id) {
                errors.push(format!("terrain/unit entry references unit {unit_id}"));
            }
        }
        for (attacker, defender) in self.unit_unit.keys() {
            if !self.units.contains_key(attacker) || !self.units.contains_key(defender) {
                errors.push(format!(
                    "unit/unit entry {attacker}:{defender} references an unknown unit"
                ));
            }
        }
        errors.sort();
        errors
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Unit definition by id.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown id.
    pub fn unit(&self, id: UnitTypeId) -> Result<&UnitDefinition> {
        self.units.get(&id).ok_or_else(|| GameError::NotFound {
            what: "unit definition",
            key: id.to_string(),
        })
    }

    /// Terrain definition by id.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown id.
    pub fn terrain(&self, id: TerrainTypeId) -> Result<&TerrainDefinition> {
        self.terrains.get(&id).ok_or_else(|| GameError::NotFound {
            what: "terrain definition",
            key: id.to_string(),
        })
    }

    /// All unit definitions ordered by id.
    pub fn units(&self) -> impl Iterator<Item = &UnitDefinition> {
        self.units.values()
    }

    /// All terrain definitions ordered by id.
    pub fn terrains(&self) -> impl Iterator<Item = &TerrainDefinition> {
        self.terrains.values()
    }

    /// Terrain/unit entry, if the rules define one.
    #[must_use]
    pub fn terrain_unit_properties(
        &self,
        terrain: TerrainTypeId,
        unit: UnitTypeId,
    ) -> Option<&TerrainUnitProperties> {
        self.terrain_unit.get(&(terrain, unit))
    }

    /// Unit/unit entry, if the rules define one.
    #[must_use]
    pub fn unit_unit_properties(
        &self,
        attacker: UnitTypeId,
        defender: UnitTypeId,
    ) -> Option<&UnitUnitProperties> {
        self.unit_unit.get(&(attacker, defender))
    }

    /// Cost for `unit` to enter `terrain`; `None` if the terrain is impassable.
    #[must_use]
    pub fn movement_cost(&self, unit: UnitTypeId, terrain: TerrainTypeId) -> Option<Fixed> {
        match self.terrain_unit_properties(terrain, unit) {
            Some(props) if props.impassable => None,
            Some(props) => Some(props.cost()),
            None => Some(Fixed::ONE),
        }
    }

    /// Attack bonus for `unit` fighting from `terrain`.
    #[must_use]
    pub fn attack_bonus(&self, terrain: TerrainTypeId, unit: UnitTypeId) -> i32 {
        self.terrain_unit_properties(terrain, unit)
            .map_or(0, |p| p.attack_bonus)
    }

    /// Defense bonus for `unit` on `terrain`, falling back to the terrain's own.
    #[must_use]
    pub fn defense_bonus(&self, terrain: TerrainTypeId, unit: UnitTypeId) -> i32 {
        match self.terrain_unit_properties(terrain, unit) {
            Some(props) => props.defense_bonus,
            None => self.terrains.get(&terrain).map_or(0, |t| t.defense_bonus),
        }
    }

    /// Health `unit` may regain per turn on `terrain`.
    #[must_use]
    pub fn healing_bonus(&self, terrain: TerrainTypeId, unit: UnitTypeId) -> u32 {
        self.terrain_unit_properties(terrain, unit)
            .map_or(0, |p| p.healing_bonus)
    }

    /// Whether `unit` may capture tiles of `terrain`.
    #[must_use]
    pub fn can_capture(&self, terrain: TerrainTypeId, unit: UnitTypeId) -> bool {
        self.terrain_unit_properties(terrain, unit)
            .is_some_and(|p| p.can_capture)
    }

    // ------------------------------------------------------------------
    // Action progression
    // ------------------------------------------------------------------

    /// Parsed action order for a unit type.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown unit type.
    pub fn action_order(&self, unit_type: UnitTypeId) -> Result<&[ActionStep]> {
        self.action_orders
            .get(&unit_type)
            .map(Vec::as_slice)
            .ok_or_else(|| GameError::NotFound {
                what: "unit definition",
                key: unit_type.to_string(),
            })
    }

    /// Actions the unit may take at its current step.
    ///
    /// A locked-in alternative narrows the step to that alternative. Point
    /// based actions need movement left. An exhausted order allows nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown unit type.
    pub fn allowed_actions(&self, unit: &Unit) -> Result<Vec<Action>> {
        let order = self.action_order(unit.unit_type)?;
        Ok(Self::actions_at(order, unit, unit.progression_step as usize, true))
    }

    /// Actions allowed now, plus the next step's when the current step only
    /// spends movement. Used to offer attacks to a unit that has not moved.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown unit type.
    pub fn allowed_actions_with_lookahead(&self, unit: &Unit) -> Result<Vec<Action>> {
        let order = self.action_order(unit.unit_type)?;
        let step = unit.progression_step as usize;
        let mut actions = Self::actions_at(order, unit, step, true);
        let point_based_step = order
            .get(step)
            .is_some_and(|s| s.iter().all(|a| a.is_point_based()));
        if point_based_step {
            for action in Self::actions_at(order, unit, step + 1, false) {
                if !actions.contains(&action) {
                    actions.push(action);
                }
            }
        }
        Ok(actions)
    }

    /// Step index at which `action` can be taken, or `None`.
    ///
    /// Non point-based actions may skip past a point-based step.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown unit type.
    pub fn step_for_action(&self, unit: &Unit, action: Action) -> Result<Option<u32>> {
        let order = self.action_order(unit.unit_type)?;
        let step = unit.progression_step as usize;
        if Self::actions_at(order, unit, step, true).contains(&action) {
            return Ok(Some(unit.progression_step));
        }
        if action.is_point_based() {
            return Ok(None);
        }
        let skippable = order
            .get(step)
            .is_some_and(|s| s.iter().all(|a| a.is_point_based()));
        if skippable && Self::actions_at(order, unit, step + 1, false).contains(&action) {
            return Ok(Some(unit.progression_step + 1));
        }
        Ok(None)
    }

    fn actions_at(order: &[ActionStep], unit: &Unit, step: usize, honor_choice: bool) -> Vec<Action> {
        let Some(alternatives) = order.get(step) else {
            return Vec::new();
        };
        alternatives
            .iter()
            .copied()
            .filter(|a| {
                !honor_choice
                    || unit
                        .chosen_alternative
                        .as_deref()
                        .map_or(true, |chosen| chosen == a.as_str())
            })
            .filter(|a| !a.is_point_based() || unit.distance_left > Fixed::ZERO)
            .collect()
    }

    /// Record that `unit` performed `action` and move its progression on.
    ///
    /// Movement keeps the unit on its step until the points run out, locking
    /// the step to the alternative it picked. Anything else finishes the step.
    /// Entering a step that allows retreat restores the retreat points.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown unit type.
    pub fn advance_progression(&self, unit: &mut Unit, action: Action) -> Result<()> {
        let order = self.action_order(unit.unit_type)?;
        let step = unit.progression_step as usize;
        let has_alternatives = order.get(step).is_some_and(|s| s.len() > 1);

        if action.is_point_based() {
            if has_alternatives {
                unit.chosen_alternative = Some(action.as_str().to_string());
            }
            if unit.distance_left > Fixed::ZERO {
                return Ok(());
            }
        }
        unit.progression_step += 1;
        unit.chosen_alternative = None;

        let entering_retreat = order
            .get(unit.progression_step as usize)
            .is_some_and(|s| s.contains(&Action::Retreat));
        if entering_retreat && action != Action::Retreat {
            let def = self.unit(unit.unit_type)?;
            unit.distance_left = def.retreat_points;
        }
        Ok(())
    }

    /// Mark a unit's order as used up for this turn.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown unit type.
    pub fn exhaust_progression(&self, unit: &mut Unit) -> Result<()> {
        let len = self.action_order(unit.unit_type)?.len();
        unit.progression_step = u32::try_from(len).unwrap_or(u32::MAX);
        unit.chosen_alternative = None;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tiles
    // ------------------------------------------------------------------

    /// Unit definitions a tile of `terrain` can build, filtered by an
    /// optional allow-list and the coins available.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown terrain.
    pub fn buildable_units(
        &self,
        terrain: TerrainTypeId,
        coins: u32,
        allowed: Option<&[UnitTypeId]>,
    ) -> Result<Vec<&UnitDefinition>> {
        let terrain = self.terrain(terrain)?;
        Ok(terrain
            .buildable_unit_ids
            .iter()
            .filter(|id| allowed.map_or(true, |list| list.contains(id)))
            .filter_map(|id| self.units.get(id))
            .filter(|def| def.coins <= coins)
            .collect())
    }

    /// Actions an owned tile may take: `build` if anything is affordable.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown terrain.
    pub fn allowed_tile_actions(
        &self,
        tile: &Tile,
        coins: u32,
        allowed: Option<&[UnitTypeId]>,
    ) -> Result<Vec<Action>> {
        if self.buildable_units(tile.tile_type, coins, allowed)?.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![Action::Build])
        }
    }

    // ------------------------------------------------------------------
    // Targeting
    // ------------------------------------------------------------------

    /// Whether `attacker` may attack `defender` where they stand now.
    ///
    /// Requires different owners, a unit/unit entry, and hex distance within
    /// the attacker's range.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown attacker type.
    pub fn can_attack(&self, attacker: &Unit, defender: &Unit) -> Result<bool> {
        if attacker.player == defender.player {
            return Ok(false);
        }
        if self
            .unit_unit_properties(attacker.unit_type, defender.unit_type)
            .is_none()
        {
            return Ok(false);
        }
        let range = self.unit(attacker.unit_type)?.attack_range;
        Ok(attacker.coord().distance(defender.coord()) <= range)
    }

    /// Coordinates of units `unit` could attack, sorted.
    ///
    /// Scans every hex within attack range, so options and validation agree.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown unit type.
    pub fn attack_options(&self, world: &World, unit: &Unit) -> Result<Vec<AxialCoord>> {
        let range = self.unit(unit.unit_type)?.attack_range;
        let mut targets = Vec::new();
        for coord in unit.coord().range(range) {
            if coord == unit.coord() {
                continue;
            }
            if let Some(target) = world.unit_at(coord) {
                if self.can_attack(unit, target)? {
                    targets.push(coord);
                }
            }
        }
        targets.sort();
        Ok(targets)
    }

    /// Adjacent damaged friendly units `unit` could repair, sorted.
    ///
    /// Only units with a fix value can repair, and only units sharing their
    /// movement medium.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown unit type.
    pub fn fix_options(&self, world: &World, unit: &Unit) -> Result<Vec<AxialCoord>> {
        let def = self.unit(unit.unit_type)?;
        if def.fix_value <= 0 {
            return Ok(Vec::new());
        }
        let mut targets = Vec::new();
        for coord in unit.coord().neighbors() {
            let Some(target) = world.unit_at(coord) else {
                continue;
            };
            if target.player != unit.player {
                continue;
            }
            let target_def = self.unit(target.unit_type)?;
            if target_def.unit_terrain == def.unit_terrain
                && target.available_health < target_def.health
            {
                targets.push(coord);
            }
        }
        targets.sort();
        Ok(targets)
    }

    /// Whether `tile` is owned by someone other than `player` and neutral.
    #[must_use]
    pub const fn is_enemy_tile(tile: &Tile, player: PlayerId) -> bool {
        tile.player != crate::components::NEUTRAL_PLAYER && tile.player != player
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Tile;

    const RULES: &str = r#"(
        units: [
            (id: 1, name: "Soldier", health: 10, movement_points: 3.0, defense: 5,
             attack_vs_class: { "Light:Land": 6 }, coins: 75),
            (id: 2, name: "Archer", health: 8, movement_points: 2.0, attack_range: 2,
             attack_vs_class: { "Light:Land": 5 }, coins: 100,
             action_order: ["attack", "retreat"], retreat_points: 1.0),
            (id: 3, name: "Medic", health: 6, movement_points: 2.0, fix_value: 8,
             action_order: ["move|fix"]),
        ],
        terrains: [
            (id: 1, name: "Grass"),
            (id: 2, name: "City", defense_bonus: 2, buildable_unit_ids: [1, 2], income: 100),
            (id: 3, name: "Mountain"),
        ],
        terrain_unit_properties: [
            (terrain_id: 2, unit_id: 1, can_capture: true, healing_bonus: 2),
            (terrain_id: 3, unit_id: 1, movement_cost: Some(2.5), defense_bonus: 3),
            (terrain_id: 3, unit_id: 2, impassable: true),
        ],
        unit_unit_properties: [
            (attacker_id: 1, defender_id: 1),
            (attacker_id: 1, defender_id: 2),
            (attacker_id: 2, defender_id: 1),
        ],
    )"#;

    fn rules() -> RulesEngine {
        RulesEngine::from_ron_str(RULES).unwrap()
    }

    fn fresh(coord: AxialCoord, player: PlayerId, unit_type: UnitTypeId) -> Unit {
        let mut unit = Unit::new(coord, player, unit_type).with_health(5);
        unit.distance_left = Fixed::from_num(3);
        unit
    }

    #[test]
    fn test_parse_step() {
        assert_eq!(
            parse_step("attack|capture").unwrap(),
            vec![Action::Attack, Action::Capture]
        );
        assert!(parse_step("attack|dance").is_err());
    }

    #[test]
    fn test_validation_collects_every_error() {
        let bad = r#"(
            units: [(id: 1, name: "Ghost", health: 0, movement_points: 1.0,
                     action_order: ["move", "teleport"])],
            terrains: [(id: 1, name: "Grass", buildable_unit_ids: [9])],
            unit_unit_properties: [(attacker_id: 1, defender_id: 4)],
        )"#;
        let Err(GameError::RulesInvalid { errors }) = RulesEngine::from_ron_str(bad) else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.len(), 4, "{errors:?}");
    }

    #[test]
    fn test_empty_tables_are_rejected() {
        let Err(GameError::RulesInvalid { errors }) = RulesEngine::from_ron_str("()") else {
            panic!("expected validation failure");
        };
        assert_eq!(errors, vec!["no terrain definitions", "no unit definitions"]);
    }

    #[test]
    fn test_parse_error_is_reported() {
        assert!(matches!(
            RulesEngine::from_ron_str("(units: [oops"),
            Err(GameError::RulesParse { .. })
        ));
    }

    #[test]
    fn test_movement_cost_lookup() {
        let rules = rules();
        assert_eq!(rules.movement_cost(1, 1), Some(Fixed::ONE));
        assert_eq!(rules.movement_cost(1, 3), Some(Fixed::from_num(2.5)));
        assert_eq!(rules.movement_cost(2, 3), None);
    }

    #[test]
    fn test_defense_bonus_falls_back_to_terrain() {
        let rules = rules();
        assert_eq!(rules.defense_bonus(3, 1), 3);
        assert_eq!(rules.defense_bonus(2, 2), 2);
        assert_eq!(rules.defense_bonus(1, 2), 0);
    }

    #[test]
    fn test_allowed_actions_follow_order() {
        let rules = rules();
        let mut unit = fresh(AxialCoord::ORIGIN, 1, 1);
        assert_eq!(rules.allowed_actions(&unit).unwrap(), vec![Action::Move]);

        unit.progression_step = 1;
        assert_eq!(
            rules.allowed_actions(&unit).unwrap(),
            vec![Action::Attack, Action::Capture]
        );

        unit.chosen_alternative = Some("capture".to_string());
        assert_eq!(rules.allowed_actions(&unit).unwrap(), vec![Action::Capture]);

        unit.progression_step = 2;
        assert!(rules.allowed_actions(&unit).unwrap().is_empty());
    }

    #[test]
    fn test_move_needs_points() {
        let rules = rules();
        let mut unit = fresh(AxialCoord::ORIGIN, 1, 1);
        unit.distance_left = Fixed::ZERO;
        assert!(rules.allowed_actions(&unit).unwrap().is_empty());
    }

    #[test]
    fn test_lookahead_offers_attack_before_moving() {
        let rules = rules();
        let unit = fresh(AxialCoord::ORIGIN, 1, 1);
        let actions = rules.allowed_actions_with_lookahead(&unit).unwrap();
        assert_eq!(actions, vec![Action::Move, Action::Attack, Action::Capture]);
        assert_eq!(rules.step_for_action(&unit, Action::Attack).unwrap(), Some(1));
        assert_eq!(rules.step_for_action(&unit, Action::Move).unwrap(), Some(0));
    }

    #[test]
    fn test_partial_move_locks_alternative() {
        let rules = rules();
        let mut medic = fresh(AxialCoord::ORIGIN, 1, 3);
        medic.distance_left = Fixed::ONE;
        rules.advance_progression(&mut medic, Action::Move).unwrap();
        assert_eq!(medic.progression_step, 0);
        assert_eq!(medic.chosen_alternative.as_deref(), Some("move"));
        assert_eq!(rules.allowed_actions(&medic).unwrap(), vec![Action::Move]);

        medic.distance_left = Fixed::ZERO;
        rules.advance_progression(&mut medic, Action::Move).unwrap();
        assert_eq!(medic.progression_step, 1);
        assert!(medic.chosen_alternative.is_none());
    }

    #[test]
    fn test_attack_then_retreat_restores_points() {
        let rules = rules();
        let mut archer = fresh(AxialCoord::ORIGIN, 1, 2);
        archer.distance_left = Fixed::ZERO;
        rules.advance_progression(&mut archer, Action::Attack).unwrap();
        assert_eq!(archer.progression_step, 1);
        assert_eq!(archer.distance_left, Fixed::ONE);
        assert_eq!(rules.allowed_actions(&archer).unwrap(), vec![Action::Retreat]);
    }

    #[test]
    fn test_tile_actions() {
        let rules = rules();
        let city = Tile::new(AxialCoord::ORIGIN, 2).owned_by(1);
        assert_eq!(
            rules.allowed_tile_actions(&city, 75, None).unwrap(),
            vec![Action::Build]
        );
        assert!(rules.allowed_tile_actions(&city, 74, None).unwrap().is_empty());
        assert!(rules
            .allowed_tile_actions(&city, 500, Some(&[3]))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_attack_options_respect_range_and_table() {
        let rules = rules();
        let mut world = World::new("test");
        for coord in AxialCoord::ORIGIN.range(3) {
            world.add_tile(Tile::new(coord, 1));
        }
        let archer = fresh(AxialCoord::ORIGIN, 1, 2);
        world.add_unit(archer.clone()).unwrap();
        world.add_unit(fresh(AxialCoord::new(2, -1), 2, 1)).unwrap();
        world.add_unit(fresh(AxialCoord::new(-2, 0), 2, 2)).unwrap();
        world.add_unit(fresh(AxialCoord::new(3, 0), 2, 1)).unwrap();
        world.add_unit(fresh(AxialCoord::new(0, 1), 1, 1)).unwrap();

        // Archers have no entry against archers; (3,0) is out of range.
        assert_eq!(
            rules.attack_options(&world, &archer).unwrap(),
            vec![AxialCoord::new(2, -1)]
        );
    }

    #[test]
    fn test_fix_options() {
        let rules = rules();
        let mut world = World::new("test");
        for coord in AxialCoord::ORIGIN.range(2) {
            world.add_tile(Tile::new(coord, 1));
        }
        let medic = fresh(AxialCoord::ORIGIN, 1, 3);
        world.add_unit(medic.clone()).unwrap();
        world.add_unit(fresh(AxialCoord::new(1, 0), 1, 1)).unwrap();
        world.add_unit(fresh(AxialCoord::new(-1, 0), 2, 1)).unwrap();
        world
            .add_unit(fresh(AxialCoord::new(0, 1), 1, 1).with_health(10))
            .unwrap();

        assert_eq!(
            rules.fix_options(&world, &medic).unwrap(),
            vec![AxialCoord::new(1, 0)]
        );
    }
}
