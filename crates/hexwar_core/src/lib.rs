//! # Hexwar Core
//!
//! Authoritative turn processing for a hex-grid, turn-based strategy game.
//!
//! This crate contains **only** game logic:
//! - No network or storage IO (rules files and snapshots are the exception)
//! - No global state: rules are built once and shared as `Arc<RulesEngine>`
//! - Fixed-point movement math, seeded combat rolls
//!
//! ## Crate Structure
//!
//! - [`coords`] - Axial hex coordinates and directions
//! - [`world`] - Tile/unit index with copy-on-write transaction layers
//! - [`rules`] - Rule tables and per-unit action progression
//! - [`pathfinding`] - Dijkstra movement solver
//! - [`combat`] - Hit probability, wound bonus, damage distributions
//! - [`game`] - Runtime game state and lazy per-turn refresh
//! - [`moves`] - Move dispatch and validation
//! - [`transaction`] - All-or-nothing move batches
//! - [`options`] - Read-only option queries

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod changes;
pub mod combat;
pub mod components;
pub mod config;
pub mod coords;
pub mod data;
pub mod error;
pub mod game;
pub mod math;
pub mod moves;
pub mod options;
pub mod pathfinding;
pub mod rules;
pub mod state;
pub mod transaction;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::changes::{CoinsReason, WorldChange};
    pub use crate::combat::{CombatContext, CombatSimulator};
    pub use crate::components::*;
    pub use crate::config::{GameConfig, GamePlayer, IncomeConfig};
    pub use crate::coords::{AxialCoord, Direction};
    pub use crate::data::{DamageDistribution, RulesData};
    pub use crate::error::{GameError, Result};
    pub use crate::game::Game;
    pub use crate::math::Fixed;
    pub use crate::moves::{GameMove, MoveResult};
    pub use crate::options::{GameOption, OptionsAt};
    pub use crate::pathfinding::{AllPaths, Path, PathEdge};
    pub use crate::rules::{Action, RulesEngine};
    pub use crate::state::{GameMoveHistory, GameRecord, GameState, MoveGroup, PlayerState};
    pub use crate::world::{World, WorldData};
}
