use std::fmt;

use serde::{Deserialize, Serialize};

use crate::PlacementAnalysis;

/// Deepest open well that still earns a reward.
const OPEN_WELL_CAP: u8 = 4;

/// Scores candidate placements; higher is better.
pub trait PlacementEvaluator: fmt::Debug + Send + Sync {
    fn evaluate_placement(&self, analysis: &PlacementAnalysis) -> f32;
}

/// Weights of the hand-tuned heuristic.
///
/// Negative weights are penalties. Weights are plain data and can be loaded
/// from JSON; missing fields take the [`Default`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicWeights {
    pub aggregate_height: f32,
    /// Multiplies the entry of `line_clear_bonus` for the rows cleared.
    pub lines_cleared: f32,
    pub line_clear_bonus: [f32; 5],
    pub holes: f32,
    pub hole_depth: f32,
    pub bumpiness: f32,
    /// Square each neighbour difference before summing.
    pub squared_bumpiness: bool,
    /// Max height above which the danger penalty applies.
    pub danger_threshold: u8,
    /// Multiplies the squared excess over `danger_threshold`.
    pub danger: f32,
    /// Applies to the depth of every well but the deepest.
    pub secondary_wells: f32,
    /// Applies to the depth of the deepest well, capped at 4.
    pub open_well: f32,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            aggregate_height: -0.510_066,
            lines_cleared: 0.760_666,
            line_clear_bonus: [0.0, 1.0, 3.0, 5.0, 8.0],
            holes: -0.356_63,
            hole_depth: 0.0,
            bumpiness: -0.184_483,
            squared_bumpiness: false,
            danger_threshold: 15,
            danger: -0.2,
            secondary_wells: -0.1,
            open_well: 0.1,
        }
    }
}

impl HeuristicWeights {
    /// Linear line bonus and no well reward.
    #[must_use]
    pub fn basic() -> Self {
        Self {
            line_clear_bonus: [0.0, 1.0, 2.0, 3.0, 4.0],
            open_well: 0.0,
            ..Self::default()
        }
    }

    /// Punishes buried holes and cliffs harder and saves up for big clears.
    #[must_use]
    pub fn careful() -> Self {
        Self {
            line_clear_bonus: [0.0, 0.5, 2.0, 4.5, 10.0],
            hole_depth: -0.08,
            bumpiness: -0.06,
            squared_bumpiness: true,
            danger_threshold: 12,
            danger: -0.5,
            open_well: 0.25,
            ..Self::default()
        }
    }
}

/// Weighted sum of board metrics after the placement.
#[derive(Debug, Clone, Default)]
pub struct HeuristicEvaluator {
    weights: HeuristicWeights,
}

impl HeuristicEvaluator {
    #[must_use]
    pub fn new(weights: HeuristicWeights) -> Self {
        Self { weights }
    }

    #[must_use]
    pub fn weights(&self) -> &HeuristicWeights {
        &self.weights
    }
}

#[expect(clippy::cast_precision_loss)]
impl PlacementEvaluator for HeuristicEvaluator {
    fn evaluate_placement(&self, analysis: &PlacementAnalysis) -> f32 {
        let w = &self.weights;
        let board = analysis.board_analysis();

        let lines = w.line_clear_bonus[analysis.cleared_lines().min(4)];
        let bumpiness = if w.squared_bumpiness {
            board.squared_bumpiness()
        } else {
            board.bumpiness()
        };
        let excess = f32::from(board.max_height().saturating_sub(w.danger_threshold));
        let open_well = board.deepest_well().min(OPEN_WELL_CAP);

        w.lines_cleared * lines
            + w.aggregate_height * board.aggregate_height() as f32
            + w.holes * board.num_holes() as f32
            + w.hole_depth * board.sum_of_hole_depth() as f32
            + w.bumpiness * bumpiness as f32
            + w.danger * excess * excess
            + w.secondary_wells * board.secondary_well_depth() as f32
            + w.open_well * f32::from(open_well)
    }
}
