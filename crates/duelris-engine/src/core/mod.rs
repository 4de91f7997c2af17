pub use self::{grid::*, piece::*, shape::*};

pub(crate) mod grid;
pub(crate) mod piece;
pub(crate) mod shape;

/// Number of columns in the playfield.
pub const GRID_WIDTH: usize = 10;
/// Number of visible rows in the playfield.
pub const GRID_HEIGHT: usize = 20;
