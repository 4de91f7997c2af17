use serde::{Deserialize, Serialize};

use super::rules::GameRules;

/// Per-board statistics: score, level, lines and pieces.
///
/// Score only grows and saturates at the ruleset's maximum. Level is derived
/// from the total line count every time lines are cleared.
///
/// # Example
///
/// ```
/// use duelris_engine::{GameRules, GameStats};
///
/// let rules = GameRules::classic();
/// let mut stats = GameStats::new(&rules);
/// stats.record_lines(4, &rules); // four rows at once on level 0
///
/// assert_eq!(stats.score(), 1200);
/// assert_eq!(stats.lines(), 4);
/// assert_eq!(stats.line_clear_counter()[4], 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    score: u64,
    level: usize,
    lines: usize,
    pieces: usize,
    line_clear_counter: [usize; 5],
}

impl GameStats {
    #[must_use]
    pub fn new(rules: &GameRules) -> Self {
        Self {
            score: 0,
            level: rules.level_for_lines(0),
            lines: 0,
            pieces: 0,
            line_clear_counter: [0; 5],
        }
    }

    #[must_use]
    pub const fn score(&self) -> u64 {
        self.score
    }

    #[must_use]
    pub const fn level(&self) -> usize {
        self.level
    }

    /// Total rows cleared.
    #[must_use]
    pub const fn lines(&self) -> usize {
        self.lines
    }

    /// Total pieces locked.
    #[must_use]
    pub const fn pieces(&self) -> usize {
        self.pieces
    }

    /// Histogram of clears by size: `[1]` singles through `[4]` four-row clears.
    ///
    /// `[0]` counts locks that cleared nothing.
    #[must_use]
    pub const fn line_clear_counter(&self) -> &[usize; 5] {
        &self.line_clear_counter
    }

    pub(crate) fn record_piece(&mut self) {
        self.pieces += 1;
    }

    /// Adds drop points, saturating at the maximum score.
    pub fn add_points(&mut self, points: u64, rules: &GameRules) {
        self.score = self.score.saturating_add(points).min(rules.max_score);
    }

    /// Scores a clear of `lines` rows at the current level.
    pub fn update_score(&mut self, lines: usize, rules: &GameRules) {
        self.line_clear_counter[lines.min(4)] += 1;
        if lines > 0 {
            self.add_points(rules.line_clear_score(lines, self.level), rules);
            self.lines += lines;
        }
    }

    /// Recomputes the level from the total line count.
    ///
    /// Returns `true` if the level changed.
    pub fn update_level(&mut self, rules: &GameRules) -> bool {
        let level = rules.level_for_lines(self.lines);
        let changed = level != self.level;
        self.level = level;
        changed
    }

    /// [`update_score`](Self::update_score) followed by [`update_level`](Self::update_level).
    pub fn record_lines(&mut self, lines: usize, rules: &GameRules) -> bool {
        self.update_score(lines, rules);
        self.update_level(rules)
    }

    pub(crate) fn restore(&mut self, score: u64, level: usize, lines: usize, pieces: usize) {
        self.score = score;
        self.level = level;
        self.lines = lines;
        self.pieces = pieces;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_saturating() {
        let rules = GameRules::classic();
        let mut stats = GameStats::new(&rules);
        for _ in 0..2000 {
            let before = stats.score();
            stats.record_lines(4, &rules);
            assert!(stats.score() >= before);
        }
        assert_eq!(stats.score(), rules.max_score);
        stats.add_points(u64::MAX, &rules);
        assert_eq!(stats.score(), rules.max_score);
    }

    #[test]
    fn level_follows_lines() {
        let rules = GameRules::modern();
        let mut stats = GameStats::new(&rules);
        assert!(!stats.record_lines(3, &rules));
        assert!(!stats.record_lines(4, &rules));
        assert_eq!(stats.level(), 0);
        assert!(stats.record_lines(3, &rules));
        assert_eq!(stats.level(), 1);
        assert_eq!(stats.lines(), 10);
        // The third clear is scored before the level goes up
        assert_eq!(stats.score(), 500 + 800 + 500);
    }

    #[test]
    fn start_level_carries_over() {
        let mut rules = GameRules::classic();
        rules.start_level = 3;
        let mut stats = GameStats::new(&rules);
        assert_eq!(stats.level(), 3);
        stats.record_lines(1, &rules);
        assert_eq!(stats.score(), 40 * 4);
        assert_eq!(stats.level(), 3);
    }

    #[test]
    fn empty_locks_are_counted_separately() {
        let rules = GameRules::modern();
        let mut stats = GameStats::new(&rules);
        stats.record_lines(0, &rules);
        stats.record_lines(2, &rules);
        assert_eq!(stats.line_clear_counter(), &[1, 0, 1, 0, 0]);
        assert_eq!(stats.lines(), 2);
    }
}
