//! Test fixtures and helpers.
//!
//! A small rule set plus builders for worlds and games, so tests across
//! crates start from the same map.

use std::sync::Arc;

use fixed::types::I32F32;
use hexwar_core::components::{PlayerId, TerrainTypeId, Tile, Unit, UnitTypeId};
use hexwar_core::config::GameConfig;
use hexwar_core::coords::AxialCoord;
use hexwar_core::game::Game;
use hexwar_core::rules::RulesEngine;
use hexwar_core::world::World;

/// Sample rule set in RON.
pub const RULES_RON: &str = include_str!("../data/rules.ron");

/// Unit type ids in [`RULES_RON`].
pub mod units {
    use hexwar_core::components::UnitTypeId;

    /// Foot soldier; captures cities.
    pub const INFANTRY: UnitTypeId = 1;
    /// Two-hex ranged unit that retreats after shooting.
    pub const ARCHER: UnitTypeId = 2;
    /// Heavy land unit.
    pub const TANK: UnitTypeId = 3;
    /// Long-range splash unit.
    pub const ARTILLERY: UnitTypeId = 4;
    /// Air unit.
    pub const FIGHTER: UnitTypeId = 5;
    /// Repairs adjacent units.
    pub const MEDIC: UnitTypeId = 6;
}

/// Terrain ids in [`RULES_RON`].
pub mod terrains {
    use hexwar_core::components::TerrainTypeId;

    /// Open ground.
    pub const GRASS: TerrainTypeId = 1;
    /// Slow; adds defense.
    pub const FOREST: TerrainTypeId = 2;
    /// Infantry only.
    pub const MOUNTAIN: TerrainTypeId = 3;
    /// Impassable for land units.
    pub const WATER: TerrainTypeId = 4;
    /// Builds infantry, archers, and medics.
    pub const CITY: TerrainTypeId = 5;
    /// Builds land vehicles.
    pub const FACTORY: TerrainTypeId = 6;
    /// Builds and heals aircraft.
    pub const AIRPORT: TerrainTypeId = 7;
}

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// The sample rules, parsed and validated.
///
/// # Panics
///
/// Panics if [`RULES_RON`] does not load, which is a bug in the fixture.
#[must_use]
pub fn rules() -> Arc<RulesEngine> {
    Arc::new(RulesEngine::from_ron_str(RULES_RON).expect("sample rules must load"))
}

/// Fluent world setup.
#[derive(Debug, Default)]
pub struct WorldBuilder {
    world: World,
}

impl WorldBuilder {
    /// Hexagonal map of `terrain` around the origin.
    #[must_use]
    pub fn hexagon(radius: u32, terrain: TerrainTypeId) -> Self {
        let mut world = World::new("fixture");
        for coord in AxialCoord::ORIGIN.range(radius) {
            world.add_tile(Tile::new(coord, terrain));
        }
        Self { world }
    }

    /// Replace the tile at `(q, r)`.
    #[must_use]
    pub fn tile(mut self, q: i32, r: i32, terrain: TerrainTypeId) -> Self {
        self.world
            .add_tile(Tile::new(AxialCoord::new(q, r), terrain));
        self
    }

    /// Replace the tile at `(q, r)` with one owned by `player`.
    #[must_use]
    pub fn owned_tile(mut self, q: i32, r: i32, terrain: TerrainTypeId, player: PlayerId) -> Self {
        self.world
            .add_tile(Tile::new(AxialCoord::new(q, r), terrain).owned_by(player));
        self
    }

    /// Place a unit that will fill its health on first use.
    ///
    /// # Panics
    ///
    /// Panics if there is no tile at `(q, r)` or it is already occupied.
    #[must_use]
    pub fn unit(mut self, q: i32, r: i32, player: PlayerId, unit_type: UnitTypeId) -> Self {
        self.world
            .add_unit(Unit::new(AxialCoord::new(q, r), player, unit_type))
            .expect("fixture unit must fit");
        self
    }

    /// Place a unit with explicit health.
    ///
    /// # Panics
    ///
    /// As [`Self::unit`].
    #[must_use]
    pub fn unit_with_health(
        mut self,
        q: i32,
        r: i32,
        player: PlayerId,
        unit_type: UnitTypeId,
        health: u32,
    ) -> Self {
        self.world
            .add_unit(Unit::new(AxialCoord::new(q, r), player, unit_type).with_health(health))
            .expect("fixture unit must fit");
        self
    }

    /// Finish.
    #[must_use]
    pub fn build(self) -> World {
        self.world
    }
}

/// Two-player skirmish on a radius-5 map.
///
/// Each player owns a city and a factory on their side, and starts with
/// two infantry and an archer. A neutral city sits in the middle-south.
#[must_use]
pub fn skirmish_world() -> World {
    use terrains::{CITY, FACTORY, FOREST, GRASS, MOUNTAIN, WATER};
    use units::{ARCHER, INFANTRY};

    WorldBuilder::hexagon(5, GRASS)
        .owned_tile(-4, 0, CITY, 1)
        .owned_tile(-4, 2, FACTORY, 1)
        .owned_tile(4, 0, CITY, 2)
        .owned_tile(4, -2, FACTORY, 2)
        .tile(0, 2, CITY)
        .tile(0, 0, FOREST)
        .tile(0, -1, FOREST)
        .tile(1, -3, MOUNTAIN)
        .tile(-1, 3, WATER)
        .unit(-3, 0, 1, INFANTRY)
        .unit(-3, 1, 1, INFANTRY)
        .unit(-4, 1, 1, ARCHER)
        .unit(3, 0, 2, INFANTRY)
        .unit(3, -1, 2, INFANTRY)
        .unit(4, -1, 2, ARCHER)
        .build()
}

/// A fresh two-player game on [`skirmish_world`].
///
/// # Panics
///
/// Panics if the fixture config is invalid, which is a bug in the fixture.
#[must_use]
pub fn skirmish_game(seed: u64) -> Game {
    Game::new(
        "skirmish",
        GameConfig::with_players(2),
        rules(),
        skirmish_world(),
        seed,
    )
    .expect("fixture game must start")
}
