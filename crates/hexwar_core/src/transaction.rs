//! All-or-nothing application of a move batch.
//!
//! The batch runs on a [`World::push`] layer. If every move succeeds the
//! layer is committed; otherwise it is popped and the game's scalar state
//! (turn, balances, RNG position) is restored from a checkpoint, so the game
//! is exactly as it was before the call.

use std::collections::BTreeMap;

use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use crate::components::PlayerId;
use crate::error::{GameError, Result};
use crate::game::Game;
use crate::moves::{GameMove, MoveResult};
use crate::state::PlayerState;
use crate::world::World;

/// Everything outside the world a batch can touch.
struct Checkpoint {
    current_player: PlayerId,
    turn_counter: u32,
    players: BTreeMap<PlayerId, PlayerState>,
    finished: bool,
    winning_player: Option<PlayerId>,
    rng: ChaCha8Rng,
}

impl Checkpoint {
    fn capture(game: &Game) -> Self {
        Self {
            current_player: game.current_player,
            turn_counter: game.turn_counter,
            players: game.players.clone(),
            finished: game.finished,
            winning_player: game.winning_player,
            rng: game.rng.clone(),
        }
    }

    fn restore(self, game: &mut Game) {
        game.current_player = self.current_player;
        game.turn_counter = self.turn_counter;
        game.players = self.players;
        game.finished = self.finished;
        game.winning_player = self.winning_player;
        game.rng = self.rng;
    }
}

impl Game {
    /// Apply `moves` in order, keeping all of them or none.
    ///
    /// # Errors
    ///
    /// Returns the first move's error; the game is left untouched.
    pub fn process_moves(&mut self, moves: &[GameMove]) -> Result<Vec<MoveResult>> {
        let checkpoint = Checkpoint::capture(self);
        let durable = std::mem::take(&mut self.world);
        self.world = durable.push();

        let mut results = Vec::with_capacity(moves.len());
        for (index, game_move) in moves.iter().enumerate() {
            match self.process_move(game_move) {
                Ok(result) => results.push(result),
                Err(e) => {
                    let layer = std::mem::take(&mut self.world);
                    self.world = layer.pop().ok_or_else(|| {
                        GameError::DataIntegrity("transaction layer lost its parent".to_string())
                    })?;
                    checkpoint.restore(self);
                    warn!(
                        game_id = %self.id(),
                        index,
                        %game_move,
                        error = %e,
                        "move batch rolled back"
                    );
                    return Err(e);
                }
            }
        }

        let layer = std::mem::take(&mut self.world);
        self.world = layer.commit();
        info!(
            game_id = %self.id(),
            moves = results.len(),
            player = self.current_player,
            turn = self.turn_counter,
            "move batch committed"
        );
        Ok(results)
    }

    /// Run `moves` on a throwaway copy and return what would happen.
    ///
    /// # Errors
    ///
    /// As [`Self::process_moves`].
    pub fn preview_moves(&self, moves: &[GameMove]) -> Result<(Vec<MoveResult>, World)> {
        let mut scratch = self.clone();
        let results = scratch.process_moves(moves)?;
        Ok((results, scratch.world))
    }
}
