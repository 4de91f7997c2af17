use duelris_engine::{Board, GRID_WIDTH, Grid, Piece, RotationSystem};
use serde::{Deserialize, Serialize};

use crate::{PlacementAnalysis, PlacementEvaluator};

/// Score given to a lookahead piece that has nowhere to go.
const TOP_OUT_SCORE: f32 = -10_000.0;

#[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const LAST_COLUMN: i8 = GRID_WIDTH as i8 - 1;

/// A target for the active piece: the column and rotation to drop it from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub column: i8,
    pub rotation: u8,
    pub cleared_lines: usize,
    pub score: f32,
}

/// How far the search looks past the active piece.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lookahead {
    /// Number of best current placements re-scored with the next piece.
    pub candidates: usize,
    /// Share of the next piece's best score added to a candidate.
    pub blend: f32,
}

impl Default for Lookahead {
    fn default() -> Self {
        Self {
            candidates: 5,
            blend: 0.3,
        }
    }
}

/// Exhaustive search over rotation × column drops.
///
/// Each rotation state of the rotation system is tried at every column where
/// all cells stay inside the walls. A candidate that collides at the piece's
/// current row is skipped; every other one is dropped with
/// [`Board::simulate_placement`] and scored. The first candidate with the
/// highest score wins, so ties go to lower rotations and then to columns
/// further left.
#[derive(Debug)]
pub struct PlacementSearch {
    evaluator: Box<dyn PlacementEvaluator>,
    lookahead: Option<Lookahead>,
}

impl PlacementSearch {
    #[must_use]
    pub fn new(evaluator: Box<dyn PlacementEvaluator>) -> Self {
        Self {
            evaluator,
            lookahead: None,
        }
    }

    #[must_use]
    pub fn with_lookahead(mut self, lookahead: Option<Lookahead>) -> Self {
        self.lookahead = lookahead;
        self
    }

    #[must_use]
    pub fn lookahead(&self) -> Option<Lookahead> {
        self.lookahead
    }

    /// Picks a target for the board's active piece.
    ///
    /// Returns `None` when there is no active piece or no legal placement.
    #[must_use]
    pub fn search(&self, board: &Board) -> Option<Placement> {
        let piece = board.active_piece()?;
        let system = board.rules().rotation_system;
        let candidates = placements(piece, system).filter_map(|(column, rotation)| {
            let (grid, cleared_lines) = board.simulate_placement(piece, column, rotation)?;
            let start = piece.with_rotation(rotation).with_column(column);
            Some(self.score(start, &grid, cleared_lines))
        });

        match (self.lookahead, board.next_piece()) {
            (Some(lookahead), Some(next)) if lookahead.candidates > 0 => {
                self.search_with_lookahead(candidates, next, system, lookahead)
            }
            _ => select_best(candidates.map(|(placement, _)| placement)),
        }
    }

    fn score(&self, start: Piece, grid: &Grid, cleared_lines: usize) -> (Placement, Grid) {
        let analysis = PlacementAnalysis::from_result(start, grid, cleared_lines);
        let placement = Placement {
            column: start.x(),
            rotation: start.rotation(),
            cleared_lines,
            score: self.evaluator.evaluate_placement(&analysis),
        };
        (placement, *grid)
    }

    fn search_with_lookahead(
        &self,
        candidates: impl Iterator<Item = (Placement, Grid)>,
        next: Piece,
        system: RotationSystem,
        lookahead: Lookahead,
    ) -> Option<Placement> {
        let mut candidates: Vec<_> = candidates.collect();
        // Stable, so equal scores keep enumeration order
        candidates.sort_by(|(a, _), (b, _)| b.score.total_cmp(&a.score));
        candidates.truncate(lookahead.candidates);

        let blended = candidates.into_iter().map(|(mut placement, grid)| {
            let next_best = self.best_score_on(&grid, next, system).unwrap_or(TOP_OUT_SCORE);
            placement.score += lookahead.blend * next_best;
            placement
        });
        select_best(blended)
    }

    fn best_score_on(&self, grid: &Grid, piece: Piece, system: RotationSystem) -> Option<f32> {
        placements(piece, system)
            .filter_map(|(column, rotation)| {
                let start = piece.with_rotation(rotation).with_column(column);
                PlacementAnalysis::simulate(grid, start)
            })
            .map(|analysis| self.evaluator.evaluate_placement(&analysis))
            .reduce(f32::max)
    }
}

/// Every `(column, rotation)` that keeps `piece` inside the walls.
pub fn placements(piece: Piece, system: RotationSystem) -> impl Iterator<Item = (i8, u8)> {
    let kind = piece.kind();
    (0..system.state_count(kind)).flat_map(move |rotation| {
        let (min_dx, max_dx) = kind.column_span(rotation);
        (-min_dx..=LAST_COLUMN - max_dx).map(move |column| (column, rotation))
    })
}

fn select_best(candidates: impl Iterator<Item = Placement>) -> Option<Placement> {
    let mut best_score = f32::MIN;
    let mut best = None;
    for candidate in candidates {
        if candidate.score > best_score {
            best_score = candidate.score;
            best = Some(candidate);
        }
    }
    best
}
