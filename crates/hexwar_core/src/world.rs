//! Spatial index of tiles and units with copy-on-write transaction layers.
//!
//! A [`World`] maps coordinates to at most one [`Tile`] and at most one
//! [`Unit`]. [`World::push`] wraps the current world in a child layer that
//! records only the entries it overrides; reads fall through to the parent
//! unless the child deleted the key. [`World::pop`] throws the child away
//! (rollback) and [`World::commit`] folds it into the parent.
//!
//! Layers are single-writer: a pushed world owns its parent, so the borrow
//! checker rules out touching the durable world while a batch is in flight.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::components::{PlayerId, Tile, Unit};
use crate::coords::{AxialCoord, Direction};
use crate::error::{GameError, Result};

/// Serializable snapshot of a world: what storage persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldData {
    /// Display name of the map.
    #[serde(default)]
    pub name: String,
    /// All tiles, sorted by coordinate.
    #[serde(default)]
    pub tiles: Vec<Tile>,
    /// All units, sorted by coordinate.
    #[serde(default)]
    pub units: Vec<Unit>,
}

/// Tile and unit index, optionally layered on top of a parent world.
#[derive(Debug, Clone, Default)]
pub struct World {
    name: String,
    parent: Option<Box<World>>,
    tiles: HashMap<AxialCoord, Tile>,
    units: HashMap<AxialCoord, Unit>,
    /// Keys removed in this layer that must hide the parent's entry.
    units_deleted: HashSet<AxialCoord>,
    /// Units stored in this layer, by owner.
    units_by_player: HashMap<PlayerId, BTreeSet<AxialCoord>>,
    /// Units visible through this layer (including the parent's).
    unit_count: usize,
    /// Per-player shortcut counters.
    unit_counters: BTreeMap<PlayerId, u32>,
}

impl World {
    /// Create an empty root world.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build a root world from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataIntegrity`] if two tiles or two units share a
    /// coordinate, or a unit stands where there is no tile.
    pub fn from_data(data: &WorldData) -> Result<Self> {
        let mut world = Self::new(data.name.clone());
        for tile in &data.tiles {
            if world.tiles.contains_key(&tile.coord()) {
                return Err(GameError::DataIntegrity(format!(
                    "duplicate tile at {}",
                    tile.coord()
                )));
            }
            world.add_tile(tile.clone());
        }
        // Seed counters first so units without a shortcut never collide.
        for unit in &data.units {
            world.seed_counter_from_shortcut(unit);
        }
        for unit in &data.units {
            world.add_unit(unit.clone()).map_err(|e| {
                GameError::DataIntegrity(format!("bad unit in world data: {e}"))
            })?;
        }
        Ok(world)
    }

    /// Snapshot the merged view (all layers) sorted by coordinate.
    #[must_use]
    pub fn to_data(&self) -> WorldData {
        WorldData {
            name: self.name.clone(),
            tiles: self.tiles().into_iter().cloned().collect(),
            units: self.units().into_iter().cloned().collect(),
        }
    }

    /// Map name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of layers above the root (0 for a root world).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.parent.as_ref().map_or(0, |p| p.depth() + 1)
    }

    // ------------------------------------------------------------------
    // Transaction layering
    // ------------------------------------------------------------------

    /// Start a transaction layer on top of `self`.
    #[must_use]
    pub fn push(self) -> Self {
        Self {
            name: self.name.clone(),
            unit_count: self.unit_count,
            unit_counters: self.unit_counters.clone(),
            tiles: HashMap::new(),
            units: HashMap::new(),
            units_deleted: HashSet::new(),
            units_by_player: HashMap::new(),
            parent: Some(Box::new(self)),
        }
    }

    /// Discard this layer and return the parent untouched.
    ///
    /// Returns `None` (dropping `self`) when called on a root world.
    #[must_use]
    pub fn pop(self) -> Option<Self> {
        self.parent.map(|p| *p)
    }

    /// Fold this layer's changes into the parent and return the parent.
    ///
    /// A root world is returned unchanged.
    #[must_use]
    pub fn commit(mut self) -> Self {
        let Some(parent) = self.parent.take() else {
            return self;
        };
        let mut parent = *parent;

        for (coord, tile) in self.tiles {
            parent.tiles.insert(coord, tile);
        }

        // Deletions first so re-added coordinates land cleanly.
        for coord in &self.units_deleted {
            if parent.unit_at(*coord).is_some() {
                parent.detach_unit(*coord);
            }
        }
        for (coord, unit) in self.units {
            if parent.unit_at(coord).is_some() {
                parent.detach_unit(coord);
            }
            parent.attach_unit(unit);
        }

        parent.unit_counters = self.unit_counters;
        debug_assert_eq!(parent.unit_count, self.unit_count);
        parent
    }

    // ------------------------------------------------------------------
    // Tiles
    // ------------------------------------------------------------------

    /// Tile at `coord`, looking through parent layers.
    #[must_use]
    pub fn tile_at(&self, coord: AxialCoord) -> Option<&Tile> {
        match self.tiles.get(&coord) {
            Some(tile) => Some(tile),
            None => self.parent.as_ref().and_then(|p| p.tile_at(coord)),
        }
    }

    /// Mutable tile at `coord`. Copies the parent's tile into this layer first.
    pub fn tile_mut(&mut self, coord: AxialCoord) -> Option<&mut Tile> {
        if !self.tiles.contains_key(&coord) {
            let inherited = self.parent.as_ref()?.tile_at(coord)?.clone();
            self.tiles.insert(coord, inherited);
        }
        self.tiles.get_mut(&coord)
    }

    /// Insert or replace a tile. The tile's own `q`/`r` is the key.
    pub fn add_tile(&mut self, tile: Tile) {
        self.tiles.insert(tile.coord(), tile);
    }

    /// Number of tiles visible through this layer.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.tiles().len()
    }

    /// All tiles sorted by coordinate, with child overrides applied.
    #[must_use]
    pub fn tiles(&self) -> Vec<&Tile> {
        let mut merged: BTreeMap<AxialCoord, &Tile> = BTreeMap::new();
        if let Some(parent) = &self.parent {
            for tile in parent.tiles() {
                merged.insert(tile.coord(), tile);
            }
        }
        for (coord, tile) in &self.tiles {
            merged.insert(*coord, tile);
        }
        merged.into_values().collect()
    }

    /// Existing tiles adjacent to `coord`, in canonical direction order.
    pub fn neighbors(
        &self,
        coord: AxialCoord,
    ) -> impl Iterator<Item = (AxialCoord, &Tile)> + '_ {
        coord
            .neighbors()
            .into_iter()
            .filter_map(move |n| self.tile_at(n).map(|t| (n, t)))
    }

    // ------------------------------------------------------------------
    // Units
    // ------------------------------------------------------------------

    /// Unit at `coord`, looking through parent layers unless deleted here.
    #[must_use]
    pub fn unit_at(&self, coord: AxialCoord) -> Option<&Unit> {
        if let Some(unit) = self.units.get(&coord) {
            return Some(unit);
        }
        if self.units_deleted.contains(&coord) {
            return None;
        }
        self.parent.as_ref().and_then(|p| p.unit_at(coord))
    }

    /// Mutable unit at `coord`. Copies the parent's unit into this layer first.
    pub fn unit_mut(&mut self, coord: AxialCoord) -> Option<&mut Unit> {
        if !self.units.contains_key(&coord) {
            if self.units_deleted.contains(&coord) {
                return None;
            }
            let inherited = self.parent.as_ref()?.unit_at(coord)?.clone();
            self.units_by_player
                .entry(inherited.player)
                .or_default()
                .insert(coord);
            self.units.insert(coord, inherited);
        }
        self.units.get_mut(&coord)
    }

    /// Place a unit on the map, assigning a shortcut if it has none.
    ///
    /// An existing shortcut is kept and bumps the owner's counter past it.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Validation`] if the coordinate is already occupied
    /// and [`GameError::NotFound`] if there is no tile there.
    pub fn add_unit(&mut self, mut unit: Unit) -> Result<()> {
        let coord = unit.coord();
        if self.tile_at(coord).is_none() {
            return Err(GameError::not_found_at("tile", coord));
        }
        if let Some(existing) = self.unit_at(coord) {
            return Err(GameError::Validation(format!(
                "{coord} is already occupied by unit {}",
                existing.shortcut
            )));
        }
        if unit.shortcut.is_empty() {
            unit.shortcut = self.generate_unit_shortcut(unit.player);
        } else {
            self.seed_counter_from_shortcut(&unit);
        }
        self.attach_unit(unit);
        Ok(())
    }

    /// Take the unit at `coord` off the map.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] if no unit is there; the world is left unchanged.
    pub fn remove_unit(&mut self, coord: AxialCoord) -> Result<Unit> {
        if self.unit_at(coord).is_none() {
            return Err(GameError::not_found_at("unit", coord));
        }
        self.detach_unit(coord)
            .ok_or_else(|| GameError::not_found_at("unit", coord))
    }

    /// Move the unit at `from` to `to`, keeping its stored coordinate in sync.
    ///
    /// # Errors
    ///
    /// Fails without mutating anything if there is no unit at `from`, no tile
    /// at `to`, or `to` is occupied.
    pub fn move_unit(&mut self, from: AxialCoord, to: AxialCoord) -> Result<()> {
        if from == to {
            return self
                .unit_at(from)
                .map(|_| ())
                .ok_or_else(|| GameError::not_found_at("unit", from));
        }
        if self.unit_at(from).is_none() {
            return Err(GameError::not_found_at("unit", from));
        }
        if self.tile_at(to).is_none() {
            return Err(GameError::not_found_at("tile", to));
        }
        if self.unit_at(to).is_some() {
            return Err(GameError::Validation(format!("{to} is occupied")));
        }
        let mut unit = self.remove_unit(from)?;
        unit.set_coord(to);
        self.attach_unit(unit);
        Ok(())
    }

    /// Number of units visible through this layer.
    #[must_use]
    pub const fn num_units(&self) -> usize {
        self.unit_count
    }

    /// All units sorted by coordinate, with child overrides and deletions applied.
    #[must_use]
    pub fn units(&self) -> Vec<&Unit> {
        let mut merged: BTreeMap<AxialCoord, &Unit> = BTreeMap::new();
        if let Some(parent) = &self.parent {
            for unit in parent.units() {
                let coord = unit.coord();
                if !self.units_deleted.contains(&coord) {
                    merged.insert(coord, unit);
                }
            }
        }
        for (coord, unit) in &self.units {
            merged.insert(*coord, unit);
        }
        merged.into_values().collect()
    }

    /// Units owned by `player`, sorted by coordinate.
    #[must_use]
    pub fn player_units(&self, player: PlayerId) -> Vec<&Unit> {
        let mut out: Vec<&Unit> = Vec::new();
        if let Some(parent) = &self.parent {
            out.extend(parent.player_units(player).into_iter().filter(|u| {
                let c = u.coord();
                !self.units.contains_key(&c) && !self.units_deleted.contains(&c)
            }));
        }
        if let Some(coords) = self.units_by_player.get(&player) {
            out.extend(coords.iter().filter_map(|c| self.units.get(c)));
        }
        out.sort_by_key(|u| u.coord());
        out
    }

    /// Coordinates of units owned by `player`, sorted.
    #[must_use]
    pub fn player_unit_coords(&self, player: PlayerId) -> Vec<AxialCoord> {
        self.player_units(player).iter().map(|u| u.coord()).collect()
    }

    /// Every player that owns at least one unit.
    #[must_use]
    pub fn players_with_units(&self) -> BTreeSet<PlayerId> {
        self.units().iter().map(|u| u.player).collect()
    }

    /// Find a unit by its shortcut (`A1`), case-insensitively.
    #[must_use]
    pub fn unit_by_shortcut(&self, shortcut: &str) -> Option<&Unit> {
        self.units()
            .into_iter()
            .find(|u| u.shortcut.eq_ignore_ascii_case(shortcut))
    }

    /// Resolve a textual position: `"q,r"`, a unit shortcut (`A1`), or a
    /// direction (`TR`, `left`) relative to `base`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Validation`] if the input matches none of these,
    /// or names a direction without a base.
    pub fn resolve_position(&self, input: &str, base: Option<AxialCoord>) -> Result<AxialCoord> {
        let input = input.trim();
        if input.contains(',') {
            return AxialCoord::parse_key(input);
        }
        if let Ok(dir) = input.parse::<Direction>() {
            return base.map(|b| b.neighbor(dir)).ok_or_else(|| {
                GameError::Validation(format!("direction '{input}' needs a base position"))
            });
        }
        self.unit_by_shortcut(input)
            .map(Unit::coord)
            .ok_or_else(|| GameError::Validation(format!("cannot resolve position '{input}'")))
    }

    /// Next shortcut for `player`: player letter plus a per-player counter.
    ///
    /// Players outside `1..=26` get no shortcut.
    pub fn generate_unit_shortcut(&mut self, player: PlayerId) -> String {
        let Some(letter) = player_letter(player) else {
            return String::new();
        };
        let counter = self.unit_counters.entry(player).or_insert(0);
        *counter += 1;
        format!("{letter}{counter}")
    }

    // ------------------------------------------------------------------
    // Internal index maintenance
    // ------------------------------------------------------------------

    fn attach_unit(&mut self, unit: Unit) {
        let coord = unit.coord();
        self.units_deleted.remove(&coord);
        self.units_by_player
            .entry(unit.player)
            .or_default()
            .insert(coord);
        self.units.insert(coord, unit);
        self.unit_count += 1;
    }

    /// Remove whatever unit is visible at `coord`. Caller checks presence.
    fn detach_unit(&mut self, coord: AxialCoord) -> Option<Unit> {
        let unit = match self.units.remove(&coord) {
            Some(local) => {
                if let Some(set) = self.units_by_player.get_mut(&local.player) {
                    set.remove(&coord);
                }
                local
            }
            None => self.parent.as_ref()?.unit_at(coord)?.clone(),
        };
        if self.parent.is_some() {
            self.units_deleted.insert(coord);
        }
        self.unit_count -= 1;
        Some(unit)
    }

    fn seed_counter_from_shortcut(&mut self, unit: &Unit) {
        let Some(letter) = player_letter(unit.player) else {
            return;
        };
        let Some(number) = unit
            .shortcut
            .strip_prefix(letter)
            .and_then(|n| n.parse::<u32>().ok())
        else {
            return;
        };
        let counter = self.unit_counters.entry(unit.player).or_insert(0);
        *counter = (*counter).max(number);
    }
}

fn player_letter(player: PlayerId) -> Option<char> {
    if (1..=26).contains(&player) {
        char::from_u32('A' as u32 + player - 1)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(q: i32, r: i32) -> AxialCoord {
        AxialCoord::new(q, r)
    }

    fn grid(radius: u32) -> World {
        let mut world = World::new("test");
        for coord in AxialCoord::ORIGIN.range(radius) {
            world.add_tile(Tile::new(coord, 1));
        }
        world
    }

    #[test]
    fn test_add_and_lookup() {
        let mut world = grid(2);
        world.add_unit(Unit::new(c(0, 0), 1, 1)).unwrap();
        let unit = world.unit_at(c(0, 0)).unwrap();
        assert_eq!(unit.shortcut, "A1");
        assert_eq!(world.num_units(), 1);
        assert!(world.unit_at(c(1, 0)).is_none());
    }

    #[test]
    fn test_add_rejects_occupied_and_off_map() {
        let mut world = grid(1);
        world.add_unit(Unit::new(c(0, 0), 1, 1)).unwrap();
        assert!(world.add_unit(Unit::new(c(0, 0), 2, 1)).is_err());
        assert!(world.add_unit(Unit::new(c(9, 9), 2, 1)).is_err());
        assert_eq!(world.num_units(), 1);
    }

    #[test]
    fn test_move_keeps_coordinate_in_sync() {
        let mut world = grid(2);
        world.add_unit(Unit::new(c(0, 0), 1, 1)).unwrap();
        world.move_unit(c(0, 0), c(1, -1)).unwrap();
        assert!(world.unit_at(c(0, 0)).is_none());
        let moved = world.unit_at(c(1, -1)).unwrap();
        assert_eq!(moved.coord(), c(1, -1));
        assert_eq!(moved.shortcut, "A1");
        assert_eq!(world.num_units(), 1);
    }

    #[test]
    fn test_move_to_occupied_fails_without_mutation() {
        let mut world = grid(2);
        world.add_unit(Unit::new(c(0, 0), 1, 1)).unwrap();
        world.add_unit(Unit::new(c(1, 0), 2, 1)).unwrap();
        assert!(world.move_unit(c(0, 0), c(1, 0)).is_err());
        assert_eq!(world.unit_at(c(0, 0)).unwrap().player, 1);
        assert_eq!(world.unit_at(c(1, 0)).unwrap().player, 2);
    }

    #[test]
    fn test_remove_missing_unit_is_error() {
        let mut world = grid(1);
        let err = world.remove_unit(c(0, 0)).unwrap_err();
        assert!(matches!(err, GameError::NotFound { what: "unit", .. }));
        assert_eq!(world.num_units(), 0);
    }

    #[test]
    fn test_neighbors_only_existing_tiles() {
        let world = grid(1);
        assert_eq!(world.neighbors(c(0, 0)).count(), 6);
        // Edge hex touches the center and two ring hexes.
        assert_eq!(world.neighbors(c(1, 0)).count(), 3);
    }

    #[test]
    fn test_push_pop_discards_changes() {
        let mut world = grid(2);
        world.add_unit(Unit::new(c(0, 0), 1, 1)).unwrap();
        world.add_unit(Unit::new(c(2, 0), 2, 1)).unwrap();

        let mut layer = world.push();
        layer.move_unit(c(0, 0), c(0, 1)).unwrap();
        layer.remove_unit(c(2, 0)).unwrap();
        layer.unit_mut(c(0, 1)).unwrap().available_health = 3;
        layer.tile_mut(c(1, 1)).unwrap().player = 1;
        assert_eq!(layer.num_units(), 1);
        assert!(layer.unit_at(c(2, 0)).is_none());
        assert_eq!(layer.depth(), 1);

        let world = layer.pop().unwrap();
        assert_eq!(world.num_units(), 2);
        assert!(world.unit_at(c(0, 0)).is_some());
        assert!(world.unit_at(c(0, 1)).is_none());
        assert_eq!(world.unit_at(c(0, 0)).unwrap().available_health, 0);
        assert_eq!(world.tile_at(c(1, 1)).unwrap().player, 0);
    }

    #[test]
    fn test_commit_folds_layer_into_parent() {
        let mut world = grid(2);
        world.add_unit(Unit::new(c(0, 0), 1, 1)).unwrap();
        world.add_unit(Unit::new(c(2, 0), 2, 1)).unwrap();

        let mut layer = world.push();
        layer.move_unit(c(0, 0), c(0, 1)).unwrap();
        layer.remove_unit(c(2, 0)).unwrap();
        layer.add_unit(Unit::new(c(2, 0), 1, 2)).unwrap();
        let before = layer.to_data();

        let world = layer.commit();
        assert_eq!(world.depth(), 0);
        assert_eq!(world.to_data(), before);
        assert_eq!(world.num_units(), 2);
        assert_eq!(world.unit_at(c(2, 0)).unwrap().shortcut, "A2");
        assert_eq!(world.player_units(2).len(), 0);
    }

    #[test]
    fn test_unit_mut_copies_on_write() {
        let mut world = grid(1);
        world.add_unit(Unit::new(c(0, 0), 1, 1).with_health(10)).unwrap();
        let mut layer = world.push();
        layer.unit_mut(c(0, 0)).unwrap().available_health = 4;
        assert_eq!(layer.unit_at(c(0, 0)).unwrap().available_health, 4);
        assert_eq!(layer.num_units(), 1);
        let world = layer.pop().unwrap();
        assert_eq!(world.unit_at(c(0, 0)).unwrap().available_health, 10);
    }

    #[test]
    fn test_deleted_then_readded_in_layer() {
        let mut world = grid(1);
        world.add_unit(Unit::new(c(0, 0), 1, 1)).unwrap();
        let mut layer = world.push();
        layer.remove_unit(c(0, 0)).unwrap();
        layer.add_unit(Unit::new(c(0, 0), 2, 1)).unwrap();
        layer.remove_unit(c(0, 0)).unwrap();
        assert!(layer.unit_at(c(0, 0)).is_none());
        assert_eq!(layer.num_units(), 0);
        let world = layer.commit();
        assert!(world.unit_at(c(0, 0)).is_none());
        assert_eq!(world.num_units(), 0);
    }

    #[test]
    fn test_player_units_across_layers() {
        let mut world = grid(2);
        world.add_unit(Unit::new(c(0, 0), 1, 1)).unwrap();
        world.add_unit(Unit::new(c(1, 0), 1, 1)).unwrap();
        world.add_unit(Unit::new(c(-1, 0), 2, 1)).unwrap();

        let mut layer = world.push();
        layer.remove_unit(c(1, 0)).unwrap();
        layer.add_unit(Unit::new(c(0, 1), 1, 1)).unwrap();
        layer.move_unit(c(-1, 0), c(-1, 1)).unwrap();

        assert_eq!(layer.player_unit_coords(1), vec![c(0, 0), c(0, 1)]);
        assert_eq!(layer.player_unit_coords(2), vec![c(-1, 1)]);
        assert_eq!(
            layer.players_with_units().into_iter().collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_nested_layers() {
        let mut world = grid(2);
        world.add_unit(Unit::new(c(0, 0), 1, 1)).unwrap();
        let mut outer = world.push();
        outer.move_unit(c(0, 0), c(1, 0)).unwrap();
        let mut inner = outer.push();
        inner.move_unit(c(1, 0), c(2, 0)).unwrap();
        assert_eq!(inner.depth(), 2);
        let outer = inner.pop().unwrap();
        assert!(outer.unit_at(c(1, 0)).is_some());
        let world = outer.commit();
        assert!(world.unit_at(c(1, 0)).is_some());
        assert!(world.unit_at(c(0, 0)).is_none());
    }

    #[test]
    fn test_world_data_round_trip_and_counters() {
        let mut world = grid(1);
        world.add_unit(Unit::new(c(0, 0), 2, 1)).unwrap();
        world.add_unit(Unit::new(c(1, 0), 2, 1)).unwrap();
        let data = world.to_data();
        let mut restored = World::from_data(&data).unwrap();
        assert_eq!(restored.to_data(), data);
        assert_eq!(restored.generate_unit_shortcut(2), "B3");
        assert_eq!(restored.unit_by_shortcut("b2").unwrap().coord(), c(1, 0));
    }

    #[test]
    fn test_world_data_rejects_duplicates() {
        let data = WorldData {
            name: "dup".into(),
            tiles: vec![Tile::new(c(0, 0), 1), Tile::new(c(0, 0), 2)],
            units: vec![],
        };
        assert!(matches!(
            World::from_data(&data),
            Err(GameError::DataIntegrity(_))
        ));

        let data = WorldData {
            name: "orphan".into(),
            tiles: vec![Tile::new(c(0, 0), 1)],
            units: vec![Unit::new(c(5, 5), 1, 1)],
        };
        assert!(World::from_data(&data).is_err());
    }

    #[test]
    fn test_resolve_position() {
        let mut world = grid(2);
        world.add_unit(Unit::new(c(1, -1), 1, 1)).unwrap();
        assert_eq!(world.resolve_position("2,-1", None).unwrap(), c(2, -1));
        assert_eq!(world.resolve_position("a1", None).unwrap(), c(1, -1));
        assert_eq!(world.resolve_position("TR", Some(c(0, 0))).unwrap(), c(1, -1));
        assert!(world.resolve_position("left", None).is_err());
        assert!(world.resolve_position("Z9", None).is_err());
    }
}
