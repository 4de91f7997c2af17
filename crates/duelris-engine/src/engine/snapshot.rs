use serde::{Deserialize, Serialize};

use crate::{Grid, Piece, PieceKind};

/// Everything needed to render a remote board.
///
/// Produced by [`Board::snapshot`](super::Board::snapshot) and applied to a
/// mirror board with [`Board::apply_snapshot`](super::Board::apply_snapshot).
/// How snapshots travel is up to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub grid: Grid,
    pub score: u64,
    pub level: usize,
    pub lines: usize,
    pub pieces: usize,
    pub game_over: bool,
    pub active_piece: Option<Piece>,
    pub next_piece: Option<PieceKind>,
    pub clearing_rows: Vec<usize>,
    pub clear_animation_active: bool,
}
