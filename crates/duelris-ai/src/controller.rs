use std::{collections::VecDeque, time::Duration};

use duelris_engine::{Action, Board, HeldKeys, Piece, PieceKind, RotationSystem};

use crate::{Placement, PlacementSearch};

/// Searches allowed per piece after taps that had no effect.
const MAX_REPLANS: usize = 3;

/// Rotation and column of a piece, the part of its state the plan controls.
type Pose = (u8, i8);

fn pose(piece: Piece) -> Pose {
    (piece.rotation(), piece.x())
}

/// Actions that take `piece` to `target` and drop it there.
///
/// Rotations come first, then horizontal moves, then a single drop action.
#[must_use]
pub fn plan_actions(
    piece: Piece,
    target: Pose,
    system: RotationSystem,
    hard_drop: bool,
) -> VecDeque<Action> {
    let (target_rotation, target_column) = target;
    let mut actions = VecDeque::new();

    let mut rotated = piece;
    for _ in 0..system.state_count(piece.kind()) {
        if rotated.rotation() == target_rotation {
            break;
        }
        rotated = rotated.rotated(system);
        actions.push_back(Action::Rotate);
    }

    let dx = target_column - piece.x();
    let step = if dx < 0 {
        Action::MoveLeft
    } else {
        Action::MoveRight
    };
    actions.extend((0..dx.unsigned_abs()).map(|_| step));

    actions.push_back(if hard_drop {
        Action::HardDrop
    } else {
        Action::SoftDrop
    });
    actions
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tap {
    before: Pose,
}

#[derive(Debug, Clone)]
enum Phase {
    Thinking {
        elapsed: Duration,
    },
    Acting {
        target: Placement,
        queue: VecDeque<Action>,
        /// Pose the piece should have once the last tap took effect.
        expected: Pose,
        last_tap: Option<Tap>,
        wait: Duration,
        pressed: bool,
    },
    Dropping {
        target: Option<Placement>,
        hard: bool,
    },
    Passing,
}

#[derive(Debug, Clone)]
struct Turn {
    /// Pieces locked so far and the kind of the active piece.
    id: (usize, PieceKind),
    phase: Phase,
    replans: usize,
}

/// Plays a board by producing held keys, like a human at a keyboard.
///
/// For each new piece the controller waits `think_delay`, searches for a
/// target and then taps rotate, left and right one at a time with
/// `action_delay` between taps, releasing keys in between. Once in place it
/// holds soft drop, or taps hard drop, until the piece locks.
///
/// The keys are meant for an [`InputController`](duelris_engine::InputController),
/// so the computer is bound by the same DAS and soft drop timing as a player.
///
/// When the piece ends up somewhere the plan did not expect (a wall kick
/// shifted it, or something else moved it) the remaining actions are derived
/// again. When a tap has no effect at all the target is searched again.
#[derive(Debug)]
pub struct AiController {
    search: PlacementSearch,
    think_delay: Duration,
    action_delay: Duration,
    hard_drop: bool,
    turn: Option<Turn>,
}

impl AiController {
    #[must_use]
    pub fn new(search: PlacementSearch, think_delay: Duration, action_delay: Duration) -> Self {
        Self {
            search,
            think_delay,
            action_delay,
            hard_drop: false,
            turn: None,
        }
    }

    /// Finish each piece with a hard drop instead of holding soft drop.
    #[must_use]
    pub fn with_hard_drop(mut self, hard_drop: bool) -> Self {
        self.hard_drop = hard_drop;
        self
    }

    #[must_use]
    pub fn search(&self) -> &PlacementSearch {
        &self.search
    }

    /// The placement the current piece is heading for, once chosen.
    #[must_use]
    pub fn target(&self) -> Option<Placement> {
        match self.turn.as_ref()?.phase {
            Phase::Acting { target, .. } => Some(target),
            Phase::Dropping { target, .. } => target,
            Phase::Thinking { .. } | Phase::Passing => None,
        }
    }

    /// Forgets the current piece.
    pub fn reset(&mut self) {
        self.turn = None;
    }

    /// Returns the keys to hold for the next `dt`.
    pub fn update(&mut self, board: &Board, dt: Duration) -> HeldKeys {
        if board.is_game_over() {
            self.turn = None;
            return HeldKeys::NONE;
        }
        let Some(piece) = board.active_piece().filter(|_| board.accepts_input()) else {
            return HeldKeys::NONE;
        };

        let id = (board.stats().pieces(), piece.kind());
        let mut turn = self
            .turn
            .take()
            .filter(|turn| turn.id == id)
            .unwrap_or(Turn {
                id,
                phase: Phase::Thinking {
                    elapsed: Duration::ZERO,
                },
                replans: 0,
            });
        let keys = self.step(&mut turn, board, piece, dt);
        self.turn = Some(turn);
        keys
    }

    fn plan(&self, board: &Board, piece: Piece) -> Phase {
        match self.search.search(board) {
            Some(target) => Phase::Acting {
                target,
                queue: plan_actions(
                    piece,
                    (target.rotation, target.column),
                    board.rules().rotation_system,
                    self.hard_drop,
                ),
                expected: pose(piece),
                last_tap: None,
                wait: Duration::ZERO,
                pressed: false,
            },
            None => Phase::Passing,
        }
    }

    fn step(&self, turn: &mut Turn, board: &Board, piece: Piece, dt: Duration) -> HeldKeys {
        let system = board.rules().rotation_system;
        match &mut turn.phase {
            Phase::Thinking { elapsed } => {
                *elapsed += dt;
                if *elapsed >= self.think_delay {
                    turn.phase = self.plan(board, piece);
                }
                HeldKeys::NONE
            }
            Phase::Acting {
                target,
                queue,
                expected,
                last_tap,
                wait,
                pressed,
            } => {
                *wait = wait.saturating_sub(dt);
                if *pressed {
                    *pressed = false;
                    return HeldKeys::NONE;
                }
                if !wait.is_zero() {
                    return HeldKeys::NONE;
                }

                let now = pose(piece);
                if last_tap.take().is_some_and(|tap| tap.before == now) {
                    turn.replans += 1;
                    turn.phase = if turn.replans > MAX_REPLANS {
                        Phase::Dropping {
                            target: Some(*target),
                            hard: self.hard_drop,
                        }
                    } else {
                        self.plan(board, piece)
                    };
                    return HeldKeys::NONE;
                }
                if now != *expected {
                    *queue = plan_actions(
                        piece,
                        (target.rotation, target.column),
                        system,
                        self.hard_drop,
                    );
                }

                let Some(action) = queue.pop_front() else {
                    return HeldKeys::NONE;
                };
                let (rotation, x) = now;
                let (keys, next) = match action {
                    Action::Rotate => (
                        HeldKeys {
                            rotate: true,
                            ..HeldKeys::NONE
                        },
                        (system.next_rotation(piece.kind(), rotation), x),
                    ),
                    Action::MoveLeft => (
                        HeldKeys {
                            left: true,
                            ..HeldKeys::NONE
                        },
                        (rotation, x - 1),
                    ),
                    Action::MoveRight => (
                        HeldKeys {
                            right: true,
                            ..HeldKeys::NONE
                        },
                        (rotation, x + 1),
                    ),
                    Action::SoftDrop | Action::HardDrop => {
                        let hard = action == Action::HardDrop;
                        turn.phase = Phase::Dropping {
                            target: Some(*target),
                            hard,
                        };
                        return drop_keys(hard);
                    }
                };
                *expected = next;
                *last_tap = Some(Tap { before: now });
                *wait = self.action_delay;
                *pressed = true;
                keys
            }
            Phase::Dropping { hard, .. } => drop_keys(*hard),
            Phase::Passing => HeldKeys::NONE,
        }
    }
}

fn drop_keys(hard: bool) -> HeldKeys {
    HeldKeys {
        down: !hard,
        hard_drop: hard,
        ..HeldKeys::NONE
    }
}
