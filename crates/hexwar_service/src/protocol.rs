//! JSON request/response envelope for the service binary.
//!
//! One request per line in, one response per line out.

use hexwar_core::coords::AxialCoord;
use hexwar_core::moves::GameMove;
use hexwar_core::options::OptionsAt;
use hexwar_core::state::{GameMoveHistory, GameRecord, GameState, ScreenshotIndexInfo};
use hexwar_core::world::{World, WorldData};
use serde::{Deserialize, Serialize};

use crate::attack::{SimulateAttackRequest, SimulateAttackResponse};
use crate::error::Result;
use crate::service::{GamesService, ProcessMovesResponse};
use crate::storage::{GameStateUpdater, GameStorageProvider};

/// A service call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ServiceRequest {
    /// Store a new game.
    CreateGame {
        /// Metadata and config.
        record: GameRecord,
        /// Starting map.
        world: WorldData,
        /// Combat RNG seed.
        #[serde(default)]
        seed: u64,
    },
    /// Apply a move batch.
    ProcessMoves {
        /// Game id.
        game_id: String,
        /// Moves in order.
        moves: Vec<GameMove>,
    },
    /// Query options at a position.
    GetOptionsAt {
        /// Game id.
        game_id: String,
        /// Position.
        pos: AxialCoord,
    },
    /// Stateless attack preview.
    SimulateAttack(SimulateAttackRequest),
    /// Move history of a game.
    GetHistory {
        /// Game id.
        game_id: String,
    },
    /// All stored games.
    ListGames,
    /// Screenshot indexer bookkeeping.
    UpdateScreenshotIndexInfo {
        /// Game id.
        game_id: String,
        /// Version the indexer saw.
        expected_version: u64,
        /// New bookkeeping.
        info: ScreenshotIndexInfo,
    },
}

/// A service reply.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceResponse {
    /// The new game's state.
    GameCreated {
        /// Stored state.
        state: Box<GameState>,
    },
    /// A committed batch.
    MovesProcessed(ProcessMovesResponse),
    /// Options at a position.
    Options(Box<OptionsAt>),
    /// Attack preview.
    AttackSimulation(SimulateAttackResponse),
    /// Move history.
    History(GameMoveHistory),
    /// Game list.
    Games {
        /// Metadata, sorted by id.
        games: Vec<GameRecord>,
    },
    /// Bookkeeping stored.
    Ack,
    /// The request failed.
    Error {
        /// Error message.
        message: String,
        /// Whether reloading and retrying may help.
        retryable: bool,
    },
}

impl<S: GameStorageProvider + GameStateUpdater> GamesService<S> {
    /// Dispatch one request, folding failures into [`ServiceResponse::Error`].
    pub fn handle(&self, request: ServiceRequest) -> ServiceResponse {
        match self.dispatch(request) {
            Ok(response) => response,
            Err(err) => ServiceResponse::Error {
                message: err.to_string(),
                retryable: err.is_retryable(),
            },
        }
    }

    fn dispatch(&self, request: ServiceRequest) -> Result<ServiceResponse> {
        Ok(match request {
            ServiceRequest::CreateGame {
                record,
                world,
                seed,
            } => {
                let world = World::from_data(&world)?;
                let state = self.create_game(record, world, seed)?;
                ServiceResponse::GameCreated {
                    state: Box::new(state),
                }
            }
            ServiceRequest::ProcessMoves { game_id, moves } => {
                ServiceResponse::MovesProcessed(self.process_moves(&game_id, &moves)?)
            }
            ServiceRequest::GetOptionsAt { game_id, pos } => {
                ServiceResponse::Options(Box::new(self.get_options_at(&game_id, pos)?))
            }
            ServiceRequest::SimulateAttack(request) => {
                ServiceResponse::AttackSimulation(self.simulate_attack(&request)?)
            }
            ServiceRequest::GetHistory { game_id } => {
                ServiceResponse::History(self.history(&game_id)?)
            }
            ServiceRequest::ListGames => ServiceResponse::Games {
                games: self.list_games()?,
            },
            ServiceRequest::UpdateScreenshotIndexInfo {
                game_id,
                expected_version,
                info,
            } => {
                self.update_screenshot_index_info(&game_id, expected_version, &info)?;
                ServiceResponse::Ack
            }
        })
    }
}
