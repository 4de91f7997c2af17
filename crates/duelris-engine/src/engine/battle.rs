use std::{collections::VecDeque, fmt, time::Duration};

use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::RulesError;

use super::{Board, GameRules, PieceSeed};

/// One of the two participants of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Opponent,
}

impl Side {
    pub const ALL: [Self; 2] = [Self::Player, Self::Opponent];

    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Player => Self::Opponent,
            Self::Opponent => Self::Player,
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => f.write_str("player"),
            Self::Opponent => f.write_str("opponent"),
        }
    }
}

/// Round and match structure of a battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRules {
    /// Round wins needed to take the match.
    pub rounds_to_win: usize,
    /// The match ends after this many rounds even without a winner.
    pub max_rounds: Option<usize>,
    /// Pause between the end of a round and the next one.
    pub round_end_delay_ms: u64,
    /// A round still running after this long is decided by score.
    pub round_time_limit_ms: Option<u64>,
    /// Clearing this many rows in a round wins it.
    pub lines_to_win: Option<usize>,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            rounds_to_win: 3,
            max_rounds: Some(5),
            round_end_delay_ms: 3000,
            round_time_limit_ms: Some(120_000),
            lines_to_win: None,
        }
    }
}

impl MatchRules {
    /// A single round without a time limit, decided by topping out.
    #[must_use]
    pub fn single_round() -> Self {
        Self {
            rounds_to_win: 1,
            max_rounds: Some(1),
            round_time_limit_ms: None,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), RulesError> {
        if self.rounds_to_win == 0 || self.max_rounds == Some(0) {
            return Err(RulesError::ZeroRoundsToWin);
        }
        if self.lines_to_win == Some(0) {
            return Err(RulesError::ZeroLineTarget);
        }
        Ok(())
    }

    #[must_use]
    pub fn round_end_delay(&self) -> Duration {
        Duration::from_millis(self.round_end_delay_ms)
    }

    #[must_use]
    pub fn round_time_limit(&self) -> Option<Duration> {
        self.round_time_limit_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "snake_case")]
pub enum RoundResult {
    Winner(Side),
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Winner(Side),
    Draw,
    /// The given side dropped out.
    Disconnected(Side),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum MatchState {
    Playing,
    RoundEnd { result: RoundResult, elapsed: Duration },
    GameEnd(MatchOutcome),
}

/// A board's numbers at the end of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStats {
    pub score: u64,
    pub level: usize,
    pub lines: usize,
    pub pieces: usize,
    pub topped_out: bool,
}

impl RoundStats {
    fn of(board: &Board) -> Self {
        let stats = board.stats();
        Self {
            score: stats.score(),
            level: stats.level(),
            lines: stats.lines(),
            pieces: stats.pieces(),
            topped_out: board.is_game_over(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: usize,
    /// Seed both boards were reset with; `None` for a first round played on
    /// boards handed to [`Match::with_boards`].
    pub seed: Option<PieceSeed>,
    pub result: RoundResult,
    pub duration_ms: u64,
    pub player: RoundStats,
    pub opponent: RoundStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
pub enum MatchEvent {
    RoundStarted { round: usize },
    GarbageSent { from: Side, rows: usize },
    RoundEnded { round: usize, result: RoundResult },
    MatchEnded(MatchOutcome),
}

/// Two boards played against each other over several rounds.
///
/// The match ticks both boards, moves garbage between them and decides
/// rounds. Boards are driven by their owners through [`Match::board_mut`]
/// while the state is [`MatchState::Playing`]; in any other state the boards
/// are frozen.
///
/// Each round both boards start from the same seed, drawn from the match
/// seed, so both sides see the same piece sequence.
#[derive(Debug, Clone)]
pub struct Match {
    rules: MatchRules,
    boards: [Board; 2],
    wins: [usize; 2],
    round: usize,
    round_seed: Option<PieceSeed>,
    round_elapsed: Duration,
    state: MatchState,
    history: Vec<RoundRecord>,
    rng: Pcg32,
    events: VecDeque<MatchEvent>,
}

impl Match {
    pub fn new(game_rules: &GameRules, rules: MatchRules, seed: PieceSeed) -> Result<Self, RulesError> {
        let mut rng = Pcg32::from_seed(*seed.as_bytes());
        let round_seed: PieceSeed = rng.random();
        let player = Board::new(game_rules.clone(), round_seed)?;
        let opponent = Board::new(game_rules.clone(), round_seed)?;
        Self::from_parts(rules, [player, opponent], Some(round_seed), rng)
    }

    /// Builds a match around existing boards.
    ///
    /// The boards keep their current state for the first round and are reset
    /// with fresh seeds, drawn from `seed`, for the following ones. The first
    /// round's history entry carries no seed.
    pub fn with_boards(
        rules: MatchRules,
        player: Board,
        opponent: Board,
        seed: PieceSeed,
    ) -> Result<Self, RulesError> {
        let rng = Pcg32::from_seed(*seed.as_bytes());
        Self::from_parts(rules, [player, opponent], None, rng)
    }

    fn from_parts(
        rules: MatchRules,
        boards: [Board; 2],
        round_seed: Option<PieceSeed>,
        rng: Pcg32,
    ) -> Result<Self, RulesError> {
        rules.validate()?;
        let mut this = Self {
            rules,
            boards,
            wins: [0; 2],
            round: 1,
            round_seed,
            round_elapsed: Duration::ZERO,
            state: MatchState::Playing,
            history: vec![],
            rng,
            events: VecDeque::new(),
        };
        this.events.push_back(MatchEvent::RoundStarted { round: 1 });
        Ok(this)
    }

    #[must_use]
    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    #[must_use]
    pub fn board(&self, side: Side) -> &Board {
        &self.boards[side.index()]
    }

    pub fn board_mut(&mut self, side: Side) -> &mut Board {
        &mut self.boards[side.index()]
    }

    #[must_use]
    pub fn wins(&self, side: Side) -> usize {
        self.wins[side.index()]
    }

    /// Current round, starting at 1.
    #[must_use]
    pub fn round(&self) -> usize {
        self.round
    }

    #[must_use]
    pub fn round_elapsed(&self) -> Duration {
        self.round_elapsed
    }

    /// Time left before the round is decided by score.
    #[must_use]
    pub fn round_time_remaining(&self) -> Option<Duration> {
        self.rules
            .round_time_limit()
            .map(|limit| limit.saturating_sub(self.round_elapsed))
    }

    #[must_use]
    pub fn state(&self) -> MatchState {
        self.state
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    #[must_use]
    pub fn outcome(&self) -> Option<MatchOutcome> {
        match self.state {
            MatchState::GameEnd(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Finished rounds, oldest first.
    #[must_use]
    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = MatchEvent> + '_ {
        self.events.drain(..)
    }

    /// Advances the match by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        match self.state {
            MatchState::Playing => self.tick_round(dt),
            MatchState::RoundEnd { result, elapsed } => {
                let elapsed = elapsed + dt;
                self.state = MatchState::RoundEnd { result, elapsed };
                if elapsed >= self.rules.round_end_delay() {
                    self.advance();
                }
            }
            MatchState::GameEnd(_) => {}
        }
    }

    fn tick_round(&mut self, dt: Duration) {
        self.round_elapsed += dt;
        for board in &mut self.boards {
            board.tick(dt);
        }
        for side in Side::ALL {
            let rows = self.boards[side.index()].take_outgoing_garbage();
            if rows > 0 {
                self.boards[side.other().index()].receive_garbage(rows);
                self.events.push_back(MatchEvent::GarbageSent { from: side, rows });
            }
        }
        if let Some(result) = self.round_result() {
            self.end_round(result);
        }
    }

    fn round_result(&self) -> Option<RoundResult> {
        let [player, opponent] = &self.boards;
        match (player.is_game_over(), opponent.is_game_over()) {
            (true, false) => return Some(RoundResult::Winner(Side::Opponent)),
            (false, true) => return Some(RoundResult::Winner(Side::Player)),
            (true, true) => return Some(self.by_score()),
            (false, false) => {}
        }
        if let Some(target) = self.rules.lines_to_win {
            let reached = |board: &Board| board.stats().lines() >= target;
            match (reached(player), reached(opponent)) {
                (true, false) => return Some(RoundResult::Winner(Side::Player)),
                (false, true) => return Some(RoundResult::Winner(Side::Opponent)),
                (true, true) => return Some(self.by_score()),
                (false, false) => {}
            }
        }
        self.rules
            .round_time_limit()
            .is_some_and(|limit| self.round_elapsed >= limit)
            .then(|| self.by_score())
    }

    fn by_score(&self) -> RoundResult {
        let player = self.boards[Side::Player.index()].stats().score();
        let opponent = self.boards[Side::Opponent.index()].stats().score();
        match player.cmp(&opponent) {
            std::cmp::Ordering::Greater => RoundResult::Winner(Side::Player),
            std::cmp::Ordering::Less => RoundResult::Winner(Side::Opponent),
            std::cmp::Ordering::Equal => RoundResult::Draw,
        }
    }

    fn end_round(&mut self, result: RoundResult) {
        if let RoundResult::Winner(side) = result {
            self.wins[side.index()] += 1;
        }
        self.history.push(RoundRecord {
            round: self.round,
            seed: self.round_seed,
            result,
            duration_ms: u64::try_from(self.round_elapsed.as_millis()).unwrap_or(u64::MAX),
            player: RoundStats::of(&self.boards[Side::Player.index()]),
            opponent: RoundStats::of(&self.boards[Side::Opponent.index()]),
        });
        self.events.push_back(MatchEvent::RoundEnded {
            round: self.round,
            result,
        });
        self.state = MatchState::RoundEnd {
            result,
            elapsed: Duration::ZERO,
        };
    }

    fn advance(&mut self) {
        if let Some(side) = Side::ALL
            .into_iter()
            .find(|side| self.wins[side.index()] >= self.rules.rounds_to_win)
        {
            self.finish(MatchOutcome::Winner(side));
            return;
        }
        if self.rules.max_rounds.is_some_and(|max| self.round >= max) {
            let [player, opponent] = self.wins;
            let outcome = match player.cmp(&opponent) {
                std::cmp::Ordering::Greater => MatchOutcome::Winner(Side::Player),
                std::cmp::Ordering::Less => MatchOutcome::Winner(Side::Opponent),
                std::cmp::Ordering::Equal => MatchOutcome::Draw,
            };
            self.finish(outcome);
            return;
        }
        self.round += 1;
        self.start_round();
    }

    fn start_round(&mut self) {
        let seed = self.rng.random();
        self.round_seed = Some(seed);
        for board in &mut self.boards {
            board.reset(seed);
        }
        self.round_elapsed = Duration::ZERO;
        self.state = MatchState::Playing;
        self.events
            .push_back(MatchEvent::RoundStarted { round: self.round });
    }

    fn finish(&mut self, outcome: MatchOutcome) {
        self.state = MatchState::GameEnd(outcome);
        self.events.push_back(MatchEvent::MatchEnded(outcome));
    }

    /// Ends the match at once because `side` went away.
    pub fn disconnect(&mut self, side: Side) {
        if !self.state.is_game_end() {
            self.finish(MatchOutcome::Disconnected(side));
        }
    }

    /// Starts over from round 1 with no wins, keeping the rules.
    pub fn restart(&mut self) {
        self.wins = [0; 2];
        self.round = 1;
        self.history.clear();
        self.events.clear();
        self.start_round();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PieceKind, SequenceRandomizer};

    const FRAME: Duration = Duration::from_millis(16);

    fn o_board() -> Board {
        Board::with_randomizer(
            GameRules::modern(),
            Box::new(SequenceRandomizer::new([PieceKind::O])),
            PieceSeed::from(0),
        )
        .unwrap()
    }

    fn o_match(rules: MatchRules) -> Match {
        Match::with_boards(rules, o_board(), o_board(), PieceSeed::from(42)).unwrap()
    }

    fn top_out(board: &mut Board) {
        while !board.is_game_over() {
            board.hard_drop().unwrap();
        }
    }

    /// Fills the bottom two rows with five O pieces.
    fn clear_two_rows(board: &mut Board) {
        // Spawned O pieces cover columns 5-6
        for shift in [-5i8, -3, -1, 1, 3] {
            for _ in 0..shift.abs() {
                board.try_move(shift.signum(), 0).unwrap();
            }
            board.hard_drop().unwrap();
        }
    }

    #[test]
    fn topping_out_loses_the_round() {
        let mut game = o_match(MatchRules::default());
        top_out(game.board_mut(Side::Player));
        game.tick(FRAME);
        assert_eq!(
            game.state(),
            MatchState::RoundEnd {
                result: RoundResult::Winner(Side::Opponent),
                elapsed: Duration::ZERO
            }
        );
        assert_eq!(game.wins(Side::Opponent), 1);
        assert_eq!(game.history().len(), 1);
        assert!(game.history()[0].player.topped_out);

        // Frozen until the delay runs out
        game.tick(game.rules().round_end_delay() / 2);
        assert!(game.state().is_round_end());
        game.tick(game.rules().round_end_delay());
        assert!(game.is_playing());
        assert_eq!(game.round(), 2);
        assert!(!game.board(Side::Player).is_game_over());
        assert_eq!(game.board(Side::Player).stats().pieces(), 0);
        assert_eq!(game.round_elapsed(), Duration::ZERO);
    }

    #[test]
    fn history_records_the_seed_of_each_round() {
        let mut game = o_match(MatchRules::default());
        for _ in 0..2 {
            top_out(game.board_mut(Side::Opponent));
            game.tick(FRAME);
            game.tick(game.rules().round_end_delay());
        }
        let history = game.history();
        assert_eq!(history.len(), 2);
        // Round 1 ran on the boards passed in, not on a drawn seed
        assert_eq!(history[0].seed, None);
        assert!(history[1].seed.is_some());

        // A recorded seed rebuilds the round's piece sequence
        let game = Match::new(&GameRules::modern(), MatchRules::default(), PieceSeed::from(9)).unwrap();
        let mut replay = Match::new(&GameRules::modern(), MatchRules::default(), PieceSeed::from(9)).unwrap();
        top_out(replay.board_mut(Side::Player));
        replay.tick(FRAME);
        let seed = replay.history()[0].seed.unwrap();
        let rebuilt = Board::new(GameRules::modern(), seed).unwrap();
        assert_eq!(rebuilt.active_piece(), game.board(Side::Player).active_piece());
        assert!(rebuilt.next_pieces().eq(game.board(Side::Player).next_pieces()));
    }

    #[test]
    fn first_to_three_takes_the_match() {
        let mut game = o_match(MatchRules::default());
        for round in 1..=3 {
            assert_eq!(game.round(), round);
            top_out(game.board_mut(Side::Opponent));
            game.tick(FRAME);
            game.tick(game.rules().round_end_delay());
        }
        assert_eq!(game.outcome(), Some(MatchOutcome::Winner(Side::Player)));
        assert_eq!(game.wins(Side::Player), 3);

        let events: Vec<_> = game.drain_events().collect();
        assert_eq!(events.first(), Some(&MatchEvent::RoundStarted { round: 1 }));
        assert_eq!(
            events.last(),
            Some(&MatchEvent::MatchEnded(MatchOutcome::Winner(Side::Player)))
        );

        // Nothing moves once the match is over
        game.tick(Duration::from_secs(60));
        assert_eq!(game.round(), 3);
    }

    #[test]
    fn simultaneous_top_out_goes_to_the_higher_score() {
        let mut game = o_match(MatchRules::default());
        // A soft-dropped row earns less than the same row hard dropped
        game.board_mut(Side::Player).soft_drop().unwrap();
        top_out(game.board_mut(Side::Player));
        top_out(game.board_mut(Side::Opponent));
        game.tick(FRAME);
        assert!(matches!(
            game.state(),
            MatchState::RoundEnd {
                result: RoundResult::Winner(Side::Opponent),
                ..
            }
        ));
    }

    #[test]
    fn time_limit_decides_by_score_or_draw() {
        let rules = MatchRules {
            round_time_limit_ms: Some(1000),
            max_rounds: Some(2),
            ..MatchRules::default()
        };
        let mut game = o_match(rules);
        game.tick(Duration::from_millis(999));
        assert!(game.is_playing());
        assert_eq!(game.round_time_remaining(), Some(Duration::from_millis(1)));
        game.tick(Duration::from_millis(1));
        assert!(matches!(
            game.state(),
            MatchState::RoundEnd {
                result: RoundResult::Draw,
                ..
            }
        ));
        assert_eq!(game.wins(Side::Player) + game.wins(Side::Opponent), 0);

        game.tick(game.rules().round_end_delay());
        game.board_mut(Side::Player).hard_drop().unwrap();
        game.tick(Duration::from_millis(1000));
        assert_eq!(game.wins(Side::Player), 1);

        // Second and last round played: one win against none
        game.tick(game.rules().round_end_delay());
        assert_eq!(game.outcome(), Some(MatchOutcome::Winner(Side::Player)));
        assert_eq!(game.history().len(), 2);
        assert!(game.history()[0].result.is_draw());
    }

    #[test]
    fn line_clears_send_garbage() {
        let mut game = o_match(MatchRules::default());
        clear_two_rows(game.board_mut(Side::Player));
        assert!(game.board(Side::Player).is_clearing());
        let delay = game.board(Side::Player).rules().line_clear_delay();
        game.tick(delay);

        assert_eq!(game.board(Side::Player).stats().lines(), 2);
        assert!(game.board(Side::Player).grid().is_empty());
        let grid = game.board(Side::Opponent).grid();
        let bottom = (0..10).filter(|&x| grid.is_occupied(x, 19)).count();
        assert_eq!(bottom, 9);
        assert!((0..10).all(|x| !grid.is_occupied(x, 18)));
        assert!(
            game.drain_events()
                .any(|event| event == MatchEvent::GarbageSent { from: Side::Player, rows: 1 })
        );
    }

    #[test]
    fn line_target_wins_the_round() {
        let rules = MatchRules {
            lines_to_win: Some(2),
            ..MatchRules::default()
        };
        let mut game = o_match(rules);
        clear_two_rows(game.board_mut(Side::Opponent));
        game.tick(game.board(Side::Opponent).rules().line_clear_delay());
        assert!(matches!(
            game.state(),
            MatchState::RoundEnd {
                result: RoundResult::Winner(Side::Opponent),
                ..
            }
        ));
        assert_eq!(game.history()[0].opponent.lines, 2);
    }

    #[test]
    fn disconnect_ends_immediately() {
        let mut game = o_match(MatchRules::default());
        game.disconnect(Side::Opponent);
        assert_eq!(game.outcome(), Some(MatchOutcome::Disconnected(Side::Opponent)));
        game.disconnect(Side::Player);
        assert_eq!(game.outcome(), Some(MatchOutcome::Disconnected(Side::Opponent)));
    }

    #[test]
    fn restart_clears_wins_and_history() {
        let mut game = o_match(MatchRules::default());
        top_out(game.board_mut(Side::Player));
        game.tick(FRAME);
        game.disconnect(Side::Player);
        game.restart();
        assert!(game.is_playing());
        assert_eq!(game.round(), 1);
        assert_eq!(game.wins(Side::Opponent), 0);
        assert!(game.history().is_empty());
        assert!(!game.board(Side::Player).is_game_over());
    }

    #[test]
    fn both_boards_share_the_round_seed() {
        let game = Match::new(&GameRules::modern(), MatchRules::default(), PieceSeed::from(9)).unwrap();
        let player = game.board(Side::Player);
        let opponent = game.board(Side::Opponent);
        assert_eq!(player.active_piece(), opponent.active_piece());
        assert!(player.next_pieces().eq(opponent.next_pieces()));
    }

    #[test]
    fn invalid_match_rules_are_rejected() {
        let rules = MatchRules {
            rounds_to_win: 0,
            ..MatchRules::default()
        };
        assert_eq!(rules.validate(), Err(RulesError::ZeroRoundsToWin));
        let rules = MatchRules {
            lines_to_win: Some(0),
            ..MatchRules::default()
        };
        assert!(Match::new(&GameRules::modern(), rules, PieceSeed::from(1)).is_err());
    }
}
