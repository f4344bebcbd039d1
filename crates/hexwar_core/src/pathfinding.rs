//! Movement solver: Dijkstra over the hex grid.
//!
//! All costs use fixed-point math so equal-cost paths compare equal on every
//! platform. The frontier is a min-heap ordered by total cost, then by
//! coordinate, and an edge is only replaced by a strictly cheaper one, so the
//! first minimum-cost route found always wins.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::components::Unit;
use crate::coords::AxialCoord;
use crate::error::{GameError, Result};
use crate::math::{decimal_serde, round_budget, Fixed};
use crate::rules::RulesEngine;
use crate::world::World;

/// One step of a movement tree: how the cheapest route reaches `to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathEdge {
    /// Previous hex q.
    pub from_q: i32,
    /// Previous hex r.
    pub from_r: i32,
    /// Destination hex q.
    pub to_q: i32,
    /// Destination hex r.
    pub to_r: i32,
    /// Cost of this single step.
    #[serde(with = "decimal_serde")]
    pub movement_cost: Fixed,
    /// Cost from the source up to and including this step.
    #[serde(with = "decimal_serde")]
    pub total_cost: Fixed,
    /// Terrain name of the destination hex.
    pub terrain_type: String,
    /// Human-readable cost explanation.
    pub explanation: String,
    /// Whether a unit stands on the destination hex.
    pub is_occupied: bool,
}

impl PathEdge {
    /// Previous hex.
    #[must_use]
    pub const fn from(&self) -> AxialCoord {
        AxialCoord::new(self.from_q, self.from_r)
    }

    /// Destination hex.
    #[must_use]
    pub const fn to(&self) -> AxialCoord {
        AxialCoord::new(self.to_q, self.to_r)
    }
}

/// Shortest-path tree from one source, keyed by destination (`"q,r"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllPaths {
    /// Source q.
    pub source_q: i32,
    /// Source r.
    pub source_r: i32,
    /// Cheapest incoming edge per reachable destination.
    pub edges: BTreeMap<String, PathEdge>,
}

impl AllPaths {
    /// Source hex.
    #[must_use]
    pub const fn source(&self) -> AxialCoord {
        AxialCoord::new(self.source_q, self.source_r)
    }

    /// Incoming edge for `coord`, if reachable.
    #[must_use]
    pub fn edge_to(&self, coord: AxialCoord) -> Option<&PathEdge> {
        self.edges.get(&coord.key())
    }

    /// Total cost to reach `coord`; zero for the source itself.
    #[must_use]
    pub fn cost_to(&self, coord: AxialCoord) -> Option<Fixed> {
        if coord == self.source() {
            return Some(Fixed::ZERO);
        }
        self.edge_to(coord).map(|e| e.total_cost)
    }

    /// Reachable hexes a unit could stop on, sorted.
    #[must_use]
    pub fn destinations(&self) -> Vec<AxialCoord> {
        let mut out: Vec<AxialCoord> = self
            .edges
            .values()
            .filter(|e| !e.is_occupied)
            .map(PathEdge::to)
            .collect();
        out.sort();
        out
    }

    /// Number of reachable hexes, including occupied ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether nothing is reachable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Ordered edges from a source to a destination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Edges from source to destination.
    pub edges: Vec<PathEdge>,
    /// Sum of edge movement costs.
    #[serde(with = "decimal_serde")]
    pub total_cost: Fixed,
}

impl Path {
    /// Hexes visited after the source, in order.
    #[must_use]
    pub fn steps(&self) -> Vec<AxialCoord> {
        self.edges.iter().map(PathEdge::to).collect()
    }

    /// Whether the path has no steps (source equals destination).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Rebuild the route to `destination` by following incoming edges back.
///
/// # Errors
///
/// Returns [`GameError::Unreachable`] if `destination` is not in the tree and
/// [`GameError::DataIntegrity`] if the edges do not lead back to the source.
pub fn reconstruct_path(paths: &AllPaths, destination: AxialCoord) -> Result<Path> {
    let source = paths.source();
    let mut edges = Vec::new();
    let mut current = destination;
    while current != source {
        let edge = paths.edge_to(current).ok_or(GameError::Unreachable {
            from: source,
            to: destination,
        })?;
        edges.push(edge.clone());
        if edges.len() > paths.len() {
            return Err(GameError::DataIntegrity(format!(
                "path tree from {source} contains a cycle"
            )));
        }
        current = edge.from();
    }
    edges.reverse();
    let total_cost = edges.last().map_or(Fixed::ZERO, |e| e.total_cost);
    Ok(Path { edges, total_cost })
}

/// A node in the Dijkstra frontier.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct FrontierNode {
    cost: Fixed,
    coord: AxialCoord,
}

impl Ord for FrontierNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse for cheapest-first, then lowest coordinate.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.coord.cmp(&self.coord))
    }
}

impl PartialOrd for FrontierNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl RulesEngine {
    /// Every hex `unit` can reach on `budget` movement points.
    ///
    /// The budget is rounded to the nearest whole point before comparing.
    /// Occupied hexes are passed through and reported with `is_occupied` set
    /// unless `prevent_pass_through` is given, in which case they are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] if a tile on the way has an unknown terrain.
    pub fn movement_options(
        &self,
        world: &World,
        unit: &Unit,
        budget: Fixed,
        prevent_pass_through: bool,
    ) -> Result<AllPaths> {
        self.explore(world, unit, budget, prevent_pass_through, None)
    }

    /// Cheapest route from `unit` to `destination` within `budget`.
    ///
    /// Stops exploring as soon as the destination is settled. The same
    /// position yields an empty path.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Unreachable`] if the destination cannot be reached.
    pub fn find_path_to(
        &self,
        world: &World,
        unit: &Unit,
        destination: AxialCoord,
        budget: Fixed,
        prevent_pass_through: bool,
    ) -> Result<Path> {
        if destination == unit.coord() {
            return Ok(Path::default());
        }
        let paths = self.explore(world, unit, budget, prevent_pass_through, Some(destination))?;
        reconstruct_path(&paths, destination)
    }

    /// Cost for `unit` to reach `destination` on its remaining movement.
    ///
    /// # Errors
    ///
    /// As [`Self::find_path_to`].
    pub fn movement_cost_to(
        &self,
        world: &World,
        unit: &Unit,
        destination: AxialCoord,
    ) -> Result<Fixed> {
        self.find_path_to(world, unit, destination, unit.distance_left, false)
            .map(|p| p.total_cost)
    }

    fn explore(
        &self,
        world: &World,
        unit: &Unit,
        budget: Fixed,
        prevent_pass_through: bool,
        target: Option<AxialCoord>,
    ) -> Result<AllPaths> {
        let source = unit.coord();
        let max_cost = round_budget(budget);
        let unit_name = &self.unit(unit.unit_type)?.name;

        let mut best: HashMap<AxialCoord, Fixed> = HashMap::new();
        let mut edges: BTreeMap<String, PathEdge> = BTreeMap::new();
        let mut frontier = BinaryHeap::new();

        best.insert(source, Fixed::ZERO);
        frontier.push(FrontierNode {
            cost: Fixed::ZERO,
            coord: source,
        });

        while let Some(FrontierNode { cost, coord }) = frontier.pop() {
            if best.get(&coord).is_some_and(|&known| cost > known) {
                continue;
            }
            if target == Some(coord) {
                break;
            }
            for (next, tile) in world.neighbors(coord) {
                let is_occupied = world.unit_at(next).is_some();
                if is_occupied && prevent_pass_through {
                    continue;
                }
                let Some(step_cost) = self.movement_cost(unit.unit_type, tile.tile_type) else {
                    continue;
                };
                let total = cost + step_cost;
                if total > max_cost {
                    continue;
                }
                if best.get(&next).is_some_and(|&known| total >= known) {
                    continue;
                }
                let terrain_name = &self.terrain(tile.tile_type)?.name;
                best.insert(next, total);
                edges.insert(
                    next.key(),
                    PathEdge {
                        from_q: coord.q,
                        from_r: coord.r,
                        to_q: next.q,
                        to_r: next.r,
                        movement_cost: step_cost,
                        total_cost: total,
                        terrain_type: terrain_name.clone(),
                        explanation: format!(
                            "{terrain_name} costs {unit_name} {step_cost} movement points"
                        ),
                        is_occupied,
                    },
                );
                frontier.push(FrontierNode {
                    cost: total,
                    coord: next,
                });
            }
        }

        trace!(%source, %max_cost, reachable = edges.len(), "movement explored");
        Ok(AllPaths {
            source_q: source.q,
            source_r: source.r,
            edges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Tile;
    use proptest::prelude::*;

    const GRASS: u32 = 1;
    const HILLS: u32 = 2;
    const WATER: u32 = 3;

    fn rules() -> RulesEngine {
        RulesEngine::from_ron_str(
            r#"(
                units: [(id: 1, name: "Soldier", health: 10, movement_points: 3.0)],
                terrains: [
                    (id: 1, name: "Grass"),
                    (id: 2, name: "Hills"),
                    (id: 3, name: "Water"),
                ],
                terrain_unit_properties: [
                    (terrain_id: 2, unit_id: 1, movement_cost: Some(2.0)),
                    (terrain_id: 3, unit_id: 1, impassable: true),
                ],
            )"#,
        )
        .unwrap()
    }

    fn grass_world(radius: u32) -> World {
        let mut world = World::new("grass");
        for coord in AxialCoord::ORIGIN.range(radius) {
            world.add_tile(Tile::new(coord, GRASS));
        }
        world
    }

    fn soldier(coord: AxialCoord, points: i32) -> Unit {
        let mut unit = Unit::new(coord, 1, 1).with_health(10);
        unit.distance_left = Fixed::from_num(points);
        unit
    }

    #[test]
    fn test_open_field_reaches_every_hex_in_range() {
        let rules = rules();
        let mut world = grass_world(3);
        let unit = soldier(AxialCoord::ORIGIN, 3);
        world.add_unit(unit.clone()).unwrap();

        let paths = rules
            .movement_options(&world, &unit, unit.distance_left, false)
            .unwrap();
        assert_eq!(paths.len(), 36);
        for edge in paths.edges.values() {
            let expected = Fixed::from_num(AxialCoord::ORIGIN.distance(edge.to()));
            assert_eq!(edge.total_cost, expected, "edge to {}", edge.to());
        }
    }

    #[test]
    fn test_budget_is_rounded() {
        let rules = rules();
        let world = grass_world(3);
        let mut unit = soldier(AxialCoord::ORIGIN, 0);
        unit.distance_left = Fixed::from_num(1.5);

        let paths = rules
            .movement_options(&world, &unit, unit.distance_left, false)
            .unwrap();
        assert_eq!(paths.len(), 18);
    }

    #[test]
    fn test_costly_terrain_and_explanation() {
        let rules = rules();
        let mut world = grass_world(2);
        world.add_tile(Tile::new(AxialCoord::new(1, 0), HILLS));
        let unit = soldier(AxialCoord::ORIGIN, 2);

        let paths = rules
            .movement_options(&world, &unit, unit.distance_left, false)
            .unwrap();
        let hills = paths.edge_to(AxialCoord::new(1, 0)).unwrap();
        assert_eq!(hills.movement_cost, Fixed::from_num(2));
        assert_eq!(hills.terrain_type, "Hills");
        assert_eq!(hills.explanation, "Hills costs Soldier 2 movement points");
        // Every route to (2,0) costs 3.
        assert!(paths.edge_to(AxialCoord::new(2, 0)).is_none());
        assert_eq!(paths.cost_to(AxialCoord::new(2, -1)), Some(Fixed::from_num(2)));
    }

    #[test]
    fn test_impassable_terrain_is_skipped() {
        let rules = rules();
        let mut world = grass_world(1);
        for dir in crate::coords::Direction::ALL {
            world.add_tile(Tile::new(AxialCoord::ORIGIN.neighbor(dir), WATER));
        }
        let unit = soldier(AxialCoord::ORIGIN, 3);
        let paths = rules
            .movement_options(&world, &unit, unit.distance_left, false)
            .unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn test_occupied_hexes_pass_through_but_are_not_destinations() {
        let rules = rules();
        let mut world = grass_world(2);
        let unit = soldier(AxialCoord::ORIGIN, 2);
        world.add_unit(unit.clone()).unwrap();
        world.add_unit(soldier(AxialCoord::new(1, 0), 1)).unwrap();

        let paths = rules
            .movement_options(&world, &unit, unit.distance_left, false)
            .unwrap();
        assert!(paths.edge_to(AxialCoord::new(1, 0)).unwrap().is_occupied);
        assert!(!paths.destinations().contains(&AxialCoord::new(1, 0)));
        assert_eq!(paths.cost_to(AxialCoord::new(2, 0)), Some(Fixed::from_num(2)));

        let blocked = rules
            .movement_options(&world, &unit, unit.distance_left, true)
            .unwrap();
        assert!(blocked.edge_to(AxialCoord::new(1, 0)).is_none());
        // (2,0) was only affordable through the occupied hex.
        assert!(blocked.edge_to(AxialCoord::new(2, 0)).is_none());
        assert_eq!(blocked.len(), paths.len() - 2);
    }

    #[test]
    fn test_find_path_to() {
        let rules = rules();
        let world = grass_world(3);
        let unit = soldier(AxialCoord::ORIGIN, 3);

        let path = rules
            .find_path_to(&world, &unit, AxialCoord::new(2, -1), unit.distance_left, false)
            .unwrap();
        assert_eq!(path.total_cost, Fixed::from_num(2));
        assert_eq!(path.steps().len(), 2);
        assert_eq!(path.steps().last(), Some(&AxialCoord::new(2, -1)));
        assert_eq!(path.edges[0].from(), AxialCoord::ORIGIN);

        let same = rules
            .find_path_to(&world, &unit, AxialCoord::ORIGIN, unit.distance_left, false)
            .unwrap();
        assert!(same.is_empty());
        assert_eq!(same.total_cost, Fixed::ZERO);
    }

    #[test]
    fn test_find_path_to_out_of_budget() {
        let rules = rules();
        let world = grass_world(3);
        let unit = soldier(AxialCoord::ORIGIN, 2);
        let err = rules
            .find_path_to(&world, &unit, AxialCoord::new(3, 0), unit.distance_left, false)
            .unwrap_err();
        assert!(matches!(err, GameError::Unreachable { .. }));
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let rules = rules();
        let world = grass_world(3);
        let unit = soldier(AxialCoord::ORIGIN, 3);
        let first = rules
            .movement_options(&world, &unit, unit.distance_left, false)
            .unwrap();
        for _ in 0..5 {
            let again = rules
                .movement_options(&world, &unit, unit.distance_left, false)
                .unwrap();
            assert_eq!(first, again);
        }
    }

    proptest! {
        #[test]
        fn prop_edge_costs_chain(
            hills in proptest::collection::vec((-3i32..=3, -3i32..=3), 0..10),
            budget in 0i32..6,
        ) {
            let rules = rules();
            let mut world = grass_world(3);
            for (q, r) in hills {
                let coord = AxialCoord::new(q, r);
                if coord.distance(AxialCoord::ORIGIN) <= 3 && coord != AxialCoord::ORIGIN {
                    world.add_tile(Tile::new(coord, HILLS));
                }
            }
            let unit = soldier(AxialCoord::ORIGIN, budget);
            let paths = rules
                .movement_options(&world, &unit, unit.distance_left, false)
                .unwrap();

            for edge in paths.edges.values() {
                let parent = paths.cost_to(edge.from()).unwrap();
                prop_assert_eq!(edge.total_cost, parent + edge.movement_cost);
                prop_assert!(edge.total_cost <= Fixed::from_num(budget));
                prop_assert!(edge.total_cost >= Fixed::from_num(AxialCoord::ORIGIN.distance(edge.to())));

                let path = reconstruct_path(&paths, edge.to()).unwrap();
                let summed: Fixed = path.edges.iter().map(|e| e.movement_cost).sum();
                prop_assert_eq!(summed, path.total_cost);
            }
        }
    }
}
