use serde::{Deserialize, Serialize};

use crate::PieceKind;

/// Notifications emitted by a [`Board`](super::Board) for the audio layer.
///
/// Events are fire-and-forget: they are queued as side effects of board
/// operations and never feed back into the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
pub enum BoardEvent {
    PieceSpawned(PieceKind),
    Moved,
    Rotated,
    SoftDropped,
    HardDropped { rows: usize },
    PieceLocked(PieceKind),
    /// Complete rows were found and the clear animation started.
    LineClearStarted { rows: usize },
    LinesCleared { rows: usize },
    LevelUp { level: usize },
    GarbageReceived { rows: usize },
    GameOver,
}
