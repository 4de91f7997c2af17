use std::time::Duration;

use duelris_ai::AiController;
use duelris_engine::{Board, InputController};

/// A computer player seated at one board.
///
/// The AI only produces held keys; they reach the board through an
/// [`InputController`] exactly as a keyboard would.
#[derive(Debug)]
pub(crate) struct Contestant {
    ai: AiController,
    input: InputController,
    actions: usize,
}

impl Contestant {
    pub(crate) fn new(ai: AiController) -> Self {
        Self {
            ai,
            input: InputController::new(),
            actions: 0,
        }
    }

    /// Actions that took effect since the contestant was created.
    pub(crate) fn actions(&self) -> usize {
        self.actions
    }

    /// Feeds one frame of input to `board`. Does not tick the board.
    pub(crate) fn play(&mut self, board: &mut Board, dt: Duration) {
        let keys = self.ai.update(board, dt);
        self.actions += self.input.update(board, keys, dt).len();
    }

    /// Forgets the current piece and any held keys, for a fresh board.
    pub(crate) fn reset(&mut self) {
        self.ai.reset();
        self.input.reset();
    }
}
