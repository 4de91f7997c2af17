//! Deterministic falling-block engine with a two-board battle controller.
//!
//! - [`core`] holds the plain data model: shape catalog, [`Piece`], [`Grid`].
//! - [`engine`] holds the rules-driven state machines: [`Board`],
//!   [`InputController`], [`Match`].
//!
//! Everything advances through explicit `tick(dt)` calls; nothing in this
//! crate reads a clock or a process-global random source.

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;

/// Reason a piece operation had no effect.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error, derive_more::IsVariant,
)]
pub enum MoveError {
    #[display("no active piece")]
    NoActivePiece,
    #[display("piece would collide")]
    Collision,
    #[display("line clear in progress")]
    Clearing,
    #[display("game is over")]
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("spawned piece collides with the stack")]
pub struct GameOverError;

/// Invalid rules or match configuration, detected at construction.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum RulesError {
    #[display("gravity table must not be empty")]
    EmptyGravityTable,
    #[display("gravity interval at level {level} is zero")]
    ZeroGravity { level: usize },
    #[display("gravity interval increases at level {level}")]
    IncreasingGravity { level: usize },
    #[display("lines per level must be positive")]
    ZeroLinesPerLevel,
    #[display("start level {start} exceeds max level {max}")]
    StartLevelAboveMax { start: usize, max: usize },
    #[display("preview count must be between 1 and {max}, got {count}")]
    InvalidPreviewCount { count: usize, max: usize },
    #[display("soft drop multiplier must be positive")]
    ZeroSoftDropMultiplier,
    #[display("auto-shift repeat interval must be positive")]
    ZeroDasSpeed,
    #[display("rounds to win must be positive")]
    ZeroRoundsToWin,
    #[display("line target must be positive")]
    ZeroLineTarget,
}
