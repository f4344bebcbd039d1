//! Movement inspection on saved worlds.

use std::path::Path;

use hexwar_core::components::Unit;
use hexwar_core::coords::AxialCoord;
use hexwar_core::error::GameError;
use hexwar_core::math::{to_f64, Fixed};
use hexwar_core::pathfinding::Path as MovePath;
use hexwar_core::rules::RulesEngine;
use hexwar_core::world::{World, WorldData};
use serde::Serialize;

use crate::error::{Result, ToolError};

/// One hex a unit can reach.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReachableHex {
    /// Hex q.
    pub q: i32,
    /// Hex r.
    pub r: i32,
    /// Total movement cost.
    pub cost: f64,
    /// Terrain name.
    pub terrain: String,
    /// Whether another unit stands there (can pass, cannot stop).
    pub occupied: bool,
}

/// Load a world snapshot written as JSON [`WorldData`].
///
/// # Errors
///
/// Returns [`ToolError::Io`], [`ToolError::Json`], or a
/// [`GameError::DataIntegrity`] for an inconsistent snapshot.
pub fn load_world(path: &Path) -> Result<World> {
    let contents = std::fs::read_to_string(path).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let data: WorldData = serde_json::from_str(&contents).map_err(|source| ToolError::Json {
        context: path.display().to_string(),
        source,
    })?;
    Ok(World::from_data(&data)?)
}

/// The unit at `from` and its budget: `budget` if given, otherwise the full
/// allowance of its type.
fn unit_and_budget<'w>(
    rules: &RulesEngine,
    world: &'w World,
    from: AxialCoord,
    budget: Option<Fixed>,
) -> Result<(&'w Unit, Fixed)> {
    let unit = world
        .unit_at(from)
        .ok_or_else(|| GameError::not_found_at("unit", from))?;
    let budget = match budget {
        Some(budget) => budget,
        None => rules.unit(unit.unit_type)?.movement_points,
    };
    Ok((unit, budget))
}

/// Every hex the unit at `from` can reach, in `"q,r"` key order.
///
/// # Errors
///
/// Returns [`GameError::NotFound`] if there is no unit at `from`.
pub fn reachable(
    rules: &RulesEngine,
    world: &World,
    from: AxialCoord,
    budget: Option<Fixed>,
) -> Result<Vec<ReachableHex>> {
    let (unit, budget) = unit_and_budget(rules, world, from, budget)?;
    let paths = rules.movement_options(world, unit, budget, false)?;
    Ok(paths
        .edges
        .values()
        .map(|edge| ReachableHex {
            q: edge.to_q,
            r: edge.to_r,
            cost: to_f64(edge.total_cost),
            terrain: edge.terrain_type.clone(),
            occupied: edge.is_occupied,
        })
        .collect())
}

/// Cheapest route for the unit at `from` to `to`.
///
/// # Errors
///
/// Returns [`GameError::Unreachable`] if `to` is out of range.
pub fn route(
    rules: &RulesEngine,
    world: &World,
    from: AxialCoord,
    to: AxialCoord,
    budget: Option<Fixed>,
) -> Result<MovePath> {
    let (unit, budget) = unit_and_budget(rules, world, from, budget)?;
    Ok(rules.find_path_to(world, unit, to, budget, false)?)
}
