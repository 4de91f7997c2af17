use duelris_engine::{Grid, Piece};

use crate::BoardAnalysis;

/// A candidate placement: where the piece was aimed, how many rows it
/// cleared and the grid it left behind.
#[derive(Debug)]
pub struct PlacementAnalysis {
    placement: Piece,
    cleared_lines: usize,
    board_analysis: BoardAnalysis,
}

impl PlacementAnalysis {
    /// Simulates dropping `placement` onto `before_placement`.
    ///
    /// Returns `None` if the piece collides where it starts.
    #[must_use]
    pub fn simulate(before_placement: &Grid, placement: Piece) -> Option<Self> {
        let (grid, cleared_lines) = before_placement.simulate_placement(placement)?;
        Some(Self::from_result(placement, &grid, cleared_lines))
    }

    /// Wraps an already simulated placement.
    #[must_use]
    pub fn from_result(placement: Piece, after_placement: &Grid, cleared_lines: usize) -> Self {
        Self {
            placement,
            cleared_lines,
            board_analysis: BoardAnalysis::from_grid(after_placement),
        }
    }

    /// The piece at its starting position, before the drop.
    #[must_use]
    pub fn placement(&self) -> Piece {
        self.placement
    }

    #[must_use]
    pub fn cleared_lines(&self) -> usize {
        self.cleared_lines
    }

    #[must_use]
    pub fn board_analysis(&self) -> &BoardAnalysis {
        &self.board_analysis
    }
}
