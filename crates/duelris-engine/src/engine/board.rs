use std::{collections::VecDeque, mem, time::Duration};

use arrayvec::ArrayVec;
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;

use crate::{
    FullRows, GRID_HEIGHT, GRID_WIDTH, GameOverError, Grid, MoveError, Piece, PieceKind,
    RulesError,
};

use super::{
    BoardEvent, BoardSnapshot, GameRules, GameStats,
    generator::{PieceGenerator, PieceSeed, Randomizer},
    input::Action,
};

/// Oldest events are dropped once this many are waiting to be drained.
const MAX_PENDING_EVENTS: usize = 256;

/// Rows being cleared and how long the animation has been running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearAnimation {
    rows: FullRows,
    elapsed: Duration,
}

impl ClearAnimation {
    #[must_use]
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Result of a successful [`Board::soft_drop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum SoftDrop {
    /// The piece moved down one row.
    Moved,
    /// The piece is resting; the lock delay is running.
    Grounded,
    /// The piece was resting and has been locked.
    Locked,
}

/// A single player's playfield.
///
/// The board owns its grid, the falling piece, its piece generator and its
/// statistics. It is advanced by [`tick`](Self::tick) and manipulated through
/// the piece operations, all of which return an error value instead of
/// panicking when they cannot apply (no piece, clear animation running,
/// game over, collision).
///
/// # Lifecycle of a piece
///
/// 1. [`spawn`](Self::spawn) draws the next piece; a colliding spawn ends the game
/// 2. Movement, rotation, soft drops and gravity move it around
/// 3. A hard drop, a blocked soft drop or gravity locks it (after the lock
///    delay when the rules have one)
/// 4. Complete rows start a clear animation; when it finishes rows are
///    removed, score and level are updated and the next piece spawns
///
/// # Example
///
/// ```
/// use duelris_engine::{Board, GameRules, PieceSeed};
///
/// let mut board = Board::new(GameRules::modern(), PieceSeed::from(1)).unwrap();
/// board.try_move(-1, 0).unwrap();
/// board.hard_drop().unwrap();
/// assert_eq!(board.stats().pieces(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Board {
    rules: GameRules,
    grid: Grid,
    active: Option<Piece>,
    generator: PieceGenerator,
    garbage_rng: Pcg32,
    stats: GameStats,
    game_over: bool,
    clear_animation: Option<ClearAnimation>,
    fall_elapsed: Duration,
    lock_elapsed: Option<Duration>,
    outgoing_garbage: usize,
    incoming_garbage: usize,
    preview_override: Option<PieceKind>,
    events: VecDeque<BoardEvent>,
}

/// Derives independent piece and garbage streams from one seed.
fn split_seed(seed: PieceSeed) -> (PieceSeed, Pcg32) {
    let mut root = Pcg32::from_seed(*seed.as_bytes());
    let piece_seed: PieceSeed = root.random();
    let garbage_rng = Pcg32::from_rng(&mut root);
    (piece_seed, garbage_rng)
}

impl Board {
    /// Creates a board using the randomizer named by the rules and spawns the
    /// first piece.
    pub fn new(rules: GameRules, seed: PieceSeed) -> Result<Self, RulesError> {
        let randomizer = rules.randomizer.build();
        Self::with_randomizer(rules, randomizer, seed)
    }

    /// Like [`Self::new`], with an explicit randomizer.
    pub fn with_randomizer(
        rules: GameRules,
        randomizer: Box<dyn Randomizer>,
        seed: PieceSeed,
    ) -> Result<Self, RulesError> {
        rules.validate()?;
        let (piece_seed, garbage_rng) = split_seed(seed);
        let generator =
            PieceGenerator::new(randomizer, piece_seed, rules.preview_count, rules.spawn_row);
        let mut board = Self {
            stats: GameStats::new(&rules),
            rules,
            grid: Grid::EMPTY,
            active: None,
            generator,
            garbage_rng,
            game_over: false,
            clear_animation: None,
            fall_elapsed: Duration::ZERO,
            lock_elapsed: None,
            outgoing_garbage: 0,
            incoming_garbage: 0,
            preview_override: None,
            events: VecDeque::new(),
        };
        // The first spawn lands on an empty grid; any failure is recorded as game over.
        let _ = board.spawn();
        Ok(board)
    }

    /// Clears everything except the rules and re-seeds the generator.
    pub fn reset(&mut self, seed: PieceSeed) {
        let (piece_seed, garbage_rng) = split_seed(seed);
        self.generator.reseed(piece_seed);
        self.garbage_rng = garbage_rng;
        self.grid = Grid::EMPTY;
        self.active = None;
        self.stats = GameStats::new(&self.rules);
        self.game_over = false;
        self.clear_animation = None;
        self.fall_elapsed = Duration::ZERO;
        self.lock_elapsed = None;
        self.outgoing_garbage = 0;
        self.incoming_garbage = 0;
        self.preview_override = None;
        self.events.clear();
        let _ = self.spawn();
    }

    #[must_use]
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn active_piece(&self) -> Option<Piece> {
        self.active
    }

    /// Where the active piece would land if hard dropped now.
    #[must_use]
    pub fn ghost_piece(&self) -> Option<Piece> {
        self.active.map(|piece| self.grid.drop_position(piece))
    }

    /// The piece that spawns next, positioned for spawning.
    #[must_use]
    pub fn next_piece(&self) -> Option<Piece> {
        self.preview_override
            .or_else(|| self.generator.preview().next())
            .map(|kind| Piece::spawn(kind, self.rules.spawn_row))
    }

    /// Upcoming kinds in the preview window.
    pub fn next_pieces(&self) -> impl Iterator<Item = PieceKind> + '_ {
        self.generator.preview()
    }

    #[must_use]
    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    #[must_use]
    pub fn is_clearing(&self) -> bool {
        self.clear_animation.is_some()
    }

    #[must_use]
    pub fn clear_animation(&self) -> Option<&ClearAnimation> {
        self.clear_animation.as_ref()
    }

    /// `true` while a piece is falling and can be controlled.
    #[must_use]
    pub fn accepts_input(&self) -> bool {
        self.controllable_piece().is_ok()
    }

    #[must_use]
    pub fn gravity_interval(&self) -> Duration {
        self.rules.gravity_interval(self.stats.level())
    }

    #[must_use]
    pub fn soft_drop_interval(&self) -> Duration {
        self.rules.soft_drop_interval(self.stats.level())
    }

    /// Takes all queued events, oldest first.
    pub fn drain_events(&mut self) -> impl Iterator<Item = BoardEvent> + '_ {
        self.events.drain(..)
    }

    fn push_event(&mut self, event: BoardEvent) {
        if self.events.len() >= MAX_PENDING_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    fn controllable_piece(&self) -> Result<Piece, MoveError> {
        if self.game_over {
            return Err(MoveError::GameOver);
        }
        if self.clear_animation.is_some() {
            return Err(MoveError::Clearing);
        }
        self.active.ok_or(MoveError::NoActivePiece)
    }

    /// Draws the next piece from the generator and makes it the active piece.
    ///
    /// A spawn that collides with the stack ends the game; this is the only
    /// way a game ends.
    pub fn spawn(&mut self) -> Result<(), GameOverError> {
        if self.game_over {
            return Err(GameOverError);
        }
        let piece = self.generator.next();
        self.preview_override = None;
        self.fall_elapsed = Duration::ZERO;
        self.lock_elapsed = None;
        if self.grid.is_colliding(piece) {
            self.active = None;
            self.game_over = true;
            self.push_event(BoardEvent::GameOver);
            return Err(GameOverError);
        }
        self.active = Some(piece);
        self.push_event(BoardEvent::PieceSpawned(piece.kind()));
        Ok(())
    }

    /// Returns `true` if `piece` shifted by `(dx, dy)` would collide.
    #[must_use]
    pub fn check_collision(&self, piece: Piece, dx: i8, dy: i8) -> bool {
        self.grid.is_colliding(piece.moved(dx, dy))
    }

    /// Shifts the active piece. A successful move resets the lock delay.
    pub fn try_move(&mut self, dx: i8, dy: i8) -> Result<(), MoveError> {
        let piece = self.controllable_piece()?;
        if self.check_collision(piece, dx, dy) {
            return Err(MoveError::Collision);
        }
        self.active = Some(piece.moved(dx, dy));
        self.lock_elapsed = None;
        self.push_event(BoardEvent::Moved);
        Ok(())
    }

    /// Turns the active piece clockwise, trying the kick offsets of the rules
    /// in order. A successful rotation resets the lock delay.
    pub fn try_rotate(&mut self) -> Result<(), MoveError> {
        let piece = self.controllable_piece()?;
        let rotated = piece.rotated(self.rules.rotation_system);
        let kicked = self
            .rules
            .kick_policy
            .offsets()
            .iter()
            .map(|&(dx, dy)| rotated.moved(dx, dy))
            .find(|candidate| !self.grid.is_colliding(*candidate))
            .ok_or(MoveError::Collision)?;
        self.active = Some(kicked);
        self.lock_elapsed = None;
        self.push_event(BoardEvent::Rotated);
        Ok(())
    }

    /// Moves the active piece down one row, or handles it resting.
    ///
    /// A resting piece locks at once without a lock delay; with one, the
    /// delay starts (or keeps running) instead.
    pub fn soft_drop(&mut self) -> Result<SoftDrop, MoveError> {
        let piece = self.controllable_piece()?;
        if !self.check_collision(piece, 0, 1) {
            self.active = Some(piece.moved(0, 1));
            self.lock_elapsed = None;
            self.stats.add_points(self.rules.soft_drop_points, &self.rules);
            self.push_event(BoardEvent::SoftDropped);
            return Ok(SoftDrop::Moved);
        }
        if self.rules.lock_delay().is_some() {
            self.lock_elapsed.get_or_insert(Duration::ZERO);
            return Ok(SoftDrop::Grounded);
        }
        self.lock()?;
        Ok(SoftDrop::Locked)
    }

    /// Drops the active piece as far as it goes and locks it.
    ///
    /// Returns the number of rows travelled.
    pub fn hard_drop(&mut self) -> Result<usize, MoveError> {
        let piece = self.controllable_piece()?;
        let landing = self.grid.drop_position(piece);
        let rows = usize::from(landing.y().abs_diff(piece.y()));
        self.active = Some(landing);
        let points = self.rules.hard_drop_points.saturating_mul(rows as u64);
        self.stats.add_points(points, &self.rules);
        self.push_event(BoardEvent::HardDropped { rows });
        self.lock()?;
        Ok(rows)
    }

    /// Writes the active piece into the grid.
    ///
    /// Complete rows start the clear animation and the next spawn waits for
    /// it; otherwise the next piece spawns immediately.
    pub fn lock(&mut self) -> Result<(), MoveError> {
        let piece = self.controllable_piece()?;
        self.active = None;
        self.lock_elapsed = None;
        self.grid.fill_piece(piece);
        self.stats.record_piece();
        self.push_event(BoardEvent::PieceLocked(piece.kind()));

        let rows = self.grid.full_rows();
        if rows.is_empty() {
            self.stats.update_score(0, &self.rules);
            let _ = self.spawn();
        } else {
            self.push_event(BoardEvent::LineClearStarted { rows: rows.len() });
            self.clear_animation = Some(ClearAnimation {
                rows,
                elapsed: Duration::ZERO,
            });
        }
        Ok(())
    }

    /// Finishes a running clear animation right away.
    ///
    /// Removes the complete rows, updates score and level, queues garbage for
    /// the opponent, applies garbage that arrived during the animation and
    /// spawns the next piece. Returns the number of rows removed.
    pub fn clear_lines(&mut self) -> usize {
        if self.clear_animation.take().is_none() {
            return 0;
        }
        let lines = self.grid.clear_lines();
        self.stats.update_score(lines, &self.rules);
        let level_changed = self.stats.update_level(&self.rules);
        self.outgoing_garbage += self.rules.garbage_for_lines(lines);
        self.push_event(BoardEvent::LinesCleared { rows: lines });
        if level_changed {
            self.push_event(BoardEvent::LevelUp {
                level: self.stats.level(),
            });
        }

        let pending = mem::take(&mut self.incoming_garbage);
        if pending > 0 {
            self.apply_garbage(pending);
        }
        let _ = self.spawn();
        lines
    }

    /// Advances the board by `dt`.
    ///
    /// While a clear animation runs only the animation advances. Otherwise
    /// the lock delay and gravity advance; a gravity step that cannot move
    /// the piece down locks it, or starts the lock delay when the rules have
    /// one.
    pub fn tick(&mut self, dt: Duration) {
        if self.game_over {
            return;
        }
        if let Some(animation) = &mut self.clear_animation {
            animation.elapsed += dt;
            if animation.elapsed >= self.rules.line_clear_delay() {
                self.clear_lines();
            }
            return;
        }
        let Some(piece) = self.active else {
            return;
        };

        if let (Some(elapsed), Some(delay)) = (&mut self.lock_elapsed, self.rules.lock_delay()) {
            *elapsed += dt;
            if *elapsed >= delay {
                let _ = self.lock();
                return;
            }
        }

        self.fall_elapsed += dt;
        if self.fall_elapsed < self.gravity_interval() {
            return;
        }
        self.fall_elapsed = Duration::ZERO;
        if !self.check_collision(piece, 0, 1) {
            self.active = Some(piece.moved(0, 1));
            self.lock_elapsed = None;
        } else if self.rules.lock_delay().is_some() {
            self.lock_elapsed.get_or_insert(Duration::ZERO);
        } else {
            let _ = self.lock();
        }
    }

    /// Drops `piece` turned to `rotation` at `column` onto a copy of the grid.
    ///
    /// Returns the resulting grid and the number of rows it cleared, or
    /// `None` if the piece cannot exist at its starting row. The board is
    /// never modified.
    #[must_use]
    pub fn simulate_placement(&self, piece: Piece, column: i8, rotation: u8) -> Option<(Grid, usize)> {
        self.grid
            .simulate_placement(piece.with_rotation(rotation).with_column(column))
    }

    /// Garbage rows owed to the opponent for clearing `lines` rows at once.
    #[must_use]
    pub fn garbage_for_lines(&self, lines: usize) -> usize {
        self.rules.garbage_for_lines(lines)
    }

    /// Takes the garbage rows produced since the last call.
    pub fn take_outgoing_garbage(&mut self) -> usize {
        mem::take(&mut self.outgoing_garbage)
    }

    /// Pushes `rows` garbage rows in from the bottom.
    ///
    /// Each row has one random hole. Garbage arriving during a clear
    /// animation is held back until the animation finishes. If the shift
    /// makes the falling piece overlap the stack, the piece is lifted.
    pub fn receive_garbage(&mut self, rows: usize) {
        if self.game_over || rows == 0 {
            return;
        }
        if self.clear_animation.is_some() {
            self.incoming_garbage += rows;
            return;
        }
        self.apply_garbage(rows);
    }

    fn apply_garbage(&mut self, rows: usize) {
        let rows = rows.min(GRID_HEIGHT);
        let holes: ArrayVec<usize, GRID_HEIGHT> = (0..rows)
            .map(|_| self.garbage_rng.random_range(0..GRID_WIDTH))
            .collect();
        self.grid.push_garbage(&holes);
        if let Some(mut piece) = self.active {
            for _ in 0..rows {
                if !self.grid.is_colliding(piece) {
                    break;
                }
                piece = piece.moved(0, -1);
            }
            self.active = Some(piece);
        }
        self.push_event(BoardEvent::GarbageReceived { rows });
    }

    /// Applies a discrete player action.
    pub fn apply_action(&mut self, action: Action) -> Result<(), MoveError> {
        match action {
            Action::MoveLeft => self.try_move(-1, 0),
            Action::MoveRight => self.try_move(1, 0),
            Action::Rotate => self.try_rotate(),
            Action::SoftDrop => self.soft_drop().map(|_| ()),
            Action::HardDrop => self.hard_drop().map(|_| ()),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            grid: self.grid,
            score: self.stats.score(),
            level: self.stats.level(),
            lines: self.stats.lines(),
            pieces: self.stats.pieces(),
            game_over: self.game_over,
            active_piece: self.active,
            next_piece: self.next_piece().map(|piece| piece.kind()),
            clearing_rows: self
                .clear_animation
                .as_ref()
                .map(|animation| animation.rows.to_vec())
                .unwrap_or_default(),
            clear_animation_active: self.clear_animation.is_some(),
        }
    }

    /// Overwrites the renderable state with a snapshot from a remote board.
    ///
    /// Timers restart from zero; the local generator is left untouched and
    /// the snapshot's next piece is shown instead of it.
    pub fn apply_snapshot(&mut self, snapshot: &BoardSnapshot) {
        self.grid = snapshot.grid;
        self.stats.restore(
            snapshot.score,
            snapshot.level,
            snapshot.lines,
            snapshot.pieces,
        );
        self.game_over = snapshot.game_over;
        self.active = snapshot.active_piece;
        self.preview_override = snapshot.next_piece;
        self.clear_animation = snapshot
            .clear_animation_active
            .then(|| ClearAnimation {
                rows: snapshot
                    .clearing_rows
                    .iter()
                    .copied()
                    .filter(|&y| y < GRID_HEIGHT)
                    .take(GRID_HEIGHT)
                    .collect(),
                elapsed: Duration::ZERO,
            });
        self.fall_elapsed = Duration::ZERO;
        self.lock_elapsed = None;
    }
}
