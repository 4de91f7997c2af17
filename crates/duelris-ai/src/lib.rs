//! Computer opponent for duelris boards.
//!
//! [`PlacementSearch`] scores every reachable drop of the active piece with a
//! [`PlacementEvaluator`] and [`AiController`] turns the chosen target into
//! held keys, paced like a human player. [`AiProfile`] bundles weights and
//! reaction times into difficulty presets.

pub use self::{
    board_analysis::*, controller::*, placement_analysis::*, placement_evaluator::*, profile::*,
    search::*,
};

mod board_analysis;
mod controller;
mod placement_analysis;
mod placement_evaluator;
mod profile;
mod search;
