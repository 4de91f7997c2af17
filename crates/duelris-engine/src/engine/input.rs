use std::time::Duration;

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use super::Board;

/// A discrete player action.
///
/// This is the unit of lock-step replication: applying the same actions to
/// boards with the same seed and the same ticks reproduces the same game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    MoveLeft,
    MoveRight,
    Rotate,
    SoftDrop,
    HardDrop,
}

/// Keys held down during one update.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeldKeys {
    pub left: bool,
    pub right: bool,
    pub down: bool,
    pub rotate: bool,
    pub hard_drop: bool,
}

impl HeldKeys {
    pub const NONE: Self = Self {
        left: false,
        right: false,
        down: false,
        rotate: false,
        hard_drop: false,
    };

    fn horizontal(self) -> Option<Action> {
        match (self.left, self.right) {
            (true, false) => Some(Action::MoveLeft),
            (false, true) => Some(Action::MoveRight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AutoShift {
    action: Action,
    elapsed: Duration,
    repeating: bool,
}

/// Turns held keys into board actions with delayed auto-shift.
///
/// A direction moves once when pressed, waits the DAS delay while held, then
/// repeats at the DAS speed. Releasing or switching direction starts over.
/// Soft drop acts on press and then repeats at the soft drop interval of the
/// board's current level. Rotate and hard drop fire once per press.
///
/// At most one action per category is produced per call, and the controller
/// only ever touches the board through [`Board::apply_action`], so human and
/// synthetic input behave the same.
#[derive(Debug, Default, Clone)]
pub struct InputController {
    previous: HeldKeys,
    horizontal: Option<AutoShift>,
    soft_drop_elapsed: Option<Duration>,
}

impl InputController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets held keys and timers.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Applies the actions produced by `keys` after `dt` and returns those
    /// that took effect, in application order.
    ///
    /// Once an action locks the piece the rest of the frame's actions are
    /// dropped, so one frame never moves two pieces.
    pub fn update(&mut self, board: &mut Board, keys: HeldKeys, dt: Duration) -> ArrayVec<Action, 4> {
        let mut applied = ArrayVec::new();
        let previous = self.previous;
        self.previous = keys;

        if !board.accepts_input() {
            self.horizontal = None;
            self.soft_drop_elapsed = None;
            return applied;
        }

        let mut pending = ArrayVec::<Action, 4>::new();
        if keys.rotate && !previous.rotate {
            pending.push(Action::Rotate);
        }
        if let Some(action) = self.horizontal_action(board, keys, dt) {
            pending.push(action);
        }
        if let Some(action) = self.soft_drop_action(board, keys, dt) {
            pending.push(action);
        }
        if keys.hard_drop && !previous.hard_drop {
            pending.push(Action::HardDrop);
        }

        // Actions belong to the piece that was active when the keys were read
        let locked = board.stats().pieces();
        for action in pending {
            if board.stats().pieces() != locked {
                break;
            }
            if board.apply_action(action).is_ok() {
                applied.push(action);
            }
        }
        applied
    }

    fn horizontal_action(&mut self, board: &Board, keys: HeldKeys, dt: Duration) -> Option<Action> {
        let Some(action) = keys.horizontal() else {
            self.horizontal = None;
            return None;
        };
        match &mut self.horizontal {
            Some(shift) if shift.action == action => {
                shift.elapsed += dt;
                let threshold = if shift.repeating {
                    board.rules().das_speed()
                } else {
                    board.rules().das_delay()
                };
                if shift.elapsed < threshold {
                    return None;
                }
                shift.elapsed -= threshold;
                shift.repeating = true;
                Some(action)
            }
            _ => {
                self.horizontal = Some(AutoShift {
                    action,
                    elapsed: Duration::ZERO,
                    repeating: false,
                });
                Some(action)
            }
        }
    }

    fn soft_drop_action(&mut self, board: &Board, keys: HeldKeys, dt: Duration) -> Option<Action> {
        if !keys.down {
            self.soft_drop_elapsed = None;
            return None;
        }
        let Some(elapsed) = &mut self.soft_drop_elapsed else {
            self.soft_drop_elapsed = Some(Duration::ZERO);
            return Some(Action::SoftDrop);
        };
        *elapsed += dt;
        let interval = board.soft_drop_interval();
        if *elapsed < interval {
            return None;
        }
        *elapsed -= interval;
        Some(Action::SoftDrop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GameRules, Piece, PieceKind, PieceSeed, SequenceRandomizer};

    const FRAME: Duration = Duration::from_millis(10);

    fn board(kind: PieceKind) -> Board {
        Board::with_randomizer(
            GameRules::modern(),
            Box::new(SequenceRandomizer::new([kind])),
            PieceSeed::from(3),
        )
        .unwrap()
    }

    fn keys(f: impl FnOnce(&mut HeldKeys)) -> HeldKeys {
        let mut keys = HeldKeys::NONE;
        f(&mut keys);
        keys
    }

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn held_direction_waits_das_delay_then_repeats() {
        let mut board = board(PieceKind::T);
        let mut input = InputController::new();
        let right = keys(|k| k.right = true);
        let x0 = board.active_piece().unwrap().x();

        assert_eq!(input.update(&mut board, right, FRAME).as_slice(), [Action::MoveRight]);
        assert!(input.update(&mut board, right, ms(100)).is_empty());
        // das_delay is 170 ms
        assert_eq!(input.update(&mut board, right, ms(70)).as_slice(), [Action::MoveRight]);
        assert!(input.update(&mut board, right, ms(40)).is_empty());
        // das_speed is 50 ms
        assert_eq!(input.update(&mut board, right, ms(10)).as_slice(), [Action::MoveRight]);
        assert_eq!(input.update(&mut board, right, ms(50)).as_slice(), [Action::MoveRight]);
        assert_eq!(board.active_piece().unwrap().x(), x0 + 4);
    }

    #[test]
    fn release_or_switch_restarts_the_delay() {
        let mut board = board(PieceKind::T);
        let mut input = InputController::new();
        let left = keys(|k| k.left = true);
        let right = keys(|k| k.right = true);

        input.update(&mut board, right, FRAME);
        input.update(&mut board, right, ms(160));
        assert_eq!(input.update(&mut board, left, FRAME).as_slice(), [Action::MoveLeft]);
        assert!(input.update(&mut board, left, ms(160)).is_empty());

        input.update(&mut board, HeldKeys::NONE, FRAME);
        assert_eq!(input.update(&mut board, left, FRAME).as_slice(), [Action::MoveLeft]);

        // Both directions at once cancel out
        let both = keys(|k| {
            k.left = true;
            k.right = true;
        });
        assert!(input.update(&mut board, both, ms(500)).is_empty());
    }

    #[test]
    fn rotate_and_hard_drop_fire_once_per_press() {
        let mut board = board(PieceKind::T);
        let mut input = InputController::new();
        let rotate = keys(|k| k.rotate = true);

        assert_eq!(input.update(&mut board, rotate, FRAME).as_slice(), [Action::Rotate]);
        for _ in 0..10 {
            assert!(input.update(&mut board, rotate, ms(200)).is_empty());
        }
        input.update(&mut board, HeldKeys::NONE, FRAME);
        assert_eq!(input.update(&mut board, rotate, FRAME).as_slice(), [Action::Rotate]);

        let drop = keys(|k| k.hard_drop = true);
        assert_eq!(input.update(&mut board, drop, FRAME).as_slice(), [Action::HardDrop]);
        assert!(input.update(&mut board, drop, FRAME).is_empty());
        assert_eq!(board.stats().pieces(), 1);
    }

    #[test]
    fn soft_drop_repeats_faster_than_gravity() {
        let mut board = board(PieceKind::O);
        let mut input = InputController::new();
        let down = keys(|k| k.down = true);
        let interval = board.soft_drop_interval();
        assert_eq!(interval, board.gravity_interval() / 10);

        assert_eq!(input.update(&mut board, down, FRAME).as_slice(), [Action::SoftDrop]);
        assert!(input.update(&mut board, down, interval / 2).is_empty());
        assert_eq!(input.update(&mut board, down, interval / 2).as_slice(), [Action::SoftDrop]);
        assert_eq!(board.active_piece().unwrap().y(), 2);
    }

    #[test]
    fn categories_combine_in_one_update() {
        let mut board = board(PieceKind::T);
        let mut input = InputController::new();
        let all = keys(|k| {
            k.left = true;
            k.down = true;
            k.rotate = true;
        });
        assert_eq!(
            input.update(&mut board, all, FRAME).as_slice(),
            [Action::Rotate, Action::MoveLeft, Action::SoftDrop]
        );
    }

    #[test]
    fn blocked_actions_are_not_reported() {
        let mut board = board(PieceKind::T);
        let mut input = InputController::new();
        let left = keys(|k| k.left = true);
        input.update(&mut board, left, FRAME);
        for _ in 0..20 {
            input.update(&mut board, left, ms(50));
        }
        assert_eq!(board.active_piece().unwrap().x(), 0);
        assert!(input.update(&mut board, left, ms(50)).is_empty());
    }

    #[test]
    fn suspended_after_game_over() {
        let mut board = board(PieceKind::O);
        while !board.is_game_over() {
            board.hard_drop().unwrap();
        }
        let mut input = InputController::new();
        let everything = HeldKeys {
            left: true,
            right: false,
            down: true,
            rotate: true,
            hard_drop: true,
        };
        assert!(input.update(&mut board, everything, FRAME).is_empty());
        assert!(input.update(&mut board, everything, ms(1000)).is_empty());
    }

    #[test]
    fn one_frame_never_commits_two_pieces() {
        let mut board = Board::with_randomizer(
            GameRules::classic(),
            Box::new(SequenceRandomizer::new([PieceKind::T])),
            PieceSeed::from(3),
        )
        .unwrap();
        while board.try_move(0, 1).is_ok() {}
        let mut input = InputController::new();
        let drop_both = keys(|k| {
            k.down = true;
            k.hard_drop = true;
        });

        // The soft drop locks the resting piece; the hard drop must not reach the next one
        let applied = input.update(&mut board, drop_both, FRAME);
        assert_eq!(applied.as_slice(), [Action::SoftDrop]);
        assert_eq!(board.stats().pieces(), 1);
        let spawn_row = board.rules().spawn_row;
        assert_eq!(board.active_piece(), Some(Piece::spawn(PieceKind::T, spawn_row)));
    }
}
