use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{KickPolicy, RotationSystem, RulesError};

use super::generator::RandomizerKind;

/// Frames per second of the handheld the classic timings are measured in.
const CLASSIC_FPS: f64 = 59.73;

/// Gravity in frames per row for classic levels 0 to 20.
const CLASSIC_GRAVITY_FRAMES: [u32; 21] = [
    53, 49, 45, 41, 37, 33, 28, 22, 17, 11, 10, 9, 8, 7, 6, 6, 5, 5, 4, 4, 3,
];

/// Every tunable of a single board.
///
/// One engine runs every mode; the differences between the modern and the
/// classic game live entirely in this record. Durations are stored in
/// milliseconds so rule files stay readable.
///
/// Missing fields in a rule file fall back to [`GameRules::modern`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    pub rotation_system: RotationSystem,
    pub kick_policy: KickPolicy,
    pub randomizer: RandomizerKind,
    /// Number of upcoming pieces shown.
    pub preview_count: usize,
    /// Row of the bounding box top at spawn; negative rows start above the grid.
    pub spawn_row: i8,
    /// Grace period before a grounded piece locks. `None` locks immediately.
    pub lock_delay_ms: Option<u64>,
    /// Length of the line clear animation.
    pub line_clear_delay_ms: u64,
    /// Gravity interval per level; levels past the end reuse the last entry.
    pub gravity_ms: Vec<u64>,
    /// Soft drop repeats this many times faster than gravity.
    pub soft_drop_multiplier: u32,
    pub das_delay_ms: u64,
    pub das_speed_ms: u64,
    pub start_level: usize,
    pub lines_per_level: usize,
    pub max_level: usize,
    /// Base points by number of rows cleared at once, multiplied by `level + 1`.
    pub line_scores: [u64; 5],
    pub soft_drop_points: u64,
    /// Points per row travelled by a hard drop.
    pub hard_drop_points: u64,
    pub max_score: u64,
    /// Garbage rows sent by number of rows cleared at once.
    pub garbage_table: [usize; 5],
}

impl Default for GameRules {
    fn default() -> Self {
        Self::modern()
    }
}

impl GameRules {
    /// Guideline-flavored rules: bag randomizer, wall kicks, lock delay.
    #[must_use]
    pub fn modern() -> Self {
        Self {
            rotation_system: RotationSystem::Modern,
            kick_policy: KickPolicy::Basic,
            randomizer: RandomizerKind::Bag,
            preview_count: 3,
            spawn_row: 0,
            lock_delay_ms: Some(500),
            line_clear_delay_ms: 300,
            gravity_ms: (0..20).map(|level| 1000 - 50 * level).collect(),
            soft_drop_multiplier: 10,
            das_delay_ms: 170,
            das_speed_ms: 50,
            start_level: 0,
            lines_per_level: 10,
            max_level: 19,
            line_scores: [0, 100, 300, 500, 800],
            soft_drop_points: 1,
            hard_drop_points: 2,
            max_score: 999_999,
            garbage_table: [0, 0, 1, 2, 4],
        }
    }

    /// Handheld-flavored rules: reduced rotations, no kicks, immediate locking.
    #[must_use]
    pub fn classic() -> Self {
        Self {
            rotation_system: RotationSystem::Classic,
            kick_policy: KickPolicy::None,
            randomizer: RandomizerKind::History,
            preview_count: 1,
            spawn_row: -1,
            lock_delay_ms: None,
            line_clear_delay_ms: 500,
            gravity_ms: CLASSIC_GRAVITY_FRAMES
                .iter()
                .map(|&frames| frames_to_ms(frames))
                .collect(),
            soft_drop_multiplier: 3,
            das_delay_ms: frames_to_ms(24),
            das_speed_ms: frames_to_ms(9),
            start_level: 0,
            lines_per_level: 10,
            max_level: 20,
            line_scores: [0, 40, 100, 300, 1200],
            soft_drop_points: 1,
            hard_drop_points: 2,
            max_score: 999_999,
            garbage_table: [0, 0, 1, 2, 4],
        }
    }

    pub fn validate(&self) -> Result<(), RulesError> {
        let Some(&first) = self.gravity_ms.first() else {
            return Err(RulesError::EmptyGravityTable);
        };
        if first == 0 {
            return Err(RulesError::ZeroGravity { level: 0 });
        }
        for (level, pair) in self.gravity_ms.windows(2).enumerate() {
            if pair[1] == 0 {
                return Err(RulesError::ZeroGravity { level: level + 1 });
            }
            if pair[1] > pair[0] {
                return Err(RulesError::IncreasingGravity { level: level + 1 });
            }
        }
        if self.lines_per_level == 0 {
            return Err(RulesError::ZeroLinesPerLevel);
        }
        if self.start_level > self.max_level {
            return Err(RulesError::StartLevelAboveMax {
                start: self.start_level,
                max: self.max_level,
            });
        }
        if !(1..=crate::PieceKind::LEN).contains(&self.preview_count) {
            return Err(RulesError::InvalidPreviewCount {
                count: self.preview_count,
                max: crate::PieceKind::LEN,
            });
        }
        if self.soft_drop_multiplier == 0 {
            return Err(RulesError::ZeroSoftDropMultiplier);
        }
        if self.das_speed_ms == 0 {
            return Err(RulesError::ZeroDasSpeed);
        }
        Ok(())
    }

    #[must_use]
    pub fn gravity_interval(&self, level: usize) -> Duration {
        let last = self.gravity_ms.len().saturating_sub(1);
        let ms = self.gravity_ms.get(level.min(last)).copied().unwrap_or(1000);
        Duration::from_millis(ms)
    }

    #[must_use]
    pub fn soft_drop_interval(&self, level: usize) -> Duration {
        self.gravity_interval(level) / self.soft_drop_multiplier.max(1)
    }

    #[must_use]
    pub fn lock_delay(&self) -> Option<Duration> {
        self.lock_delay_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn line_clear_delay(&self) -> Duration {
        Duration::from_millis(self.line_clear_delay_ms)
    }

    #[must_use]
    pub fn das_delay(&self) -> Duration {
        Duration::from_millis(self.das_delay_ms)
    }

    #[must_use]
    pub fn das_speed(&self) -> Duration {
        Duration::from_millis(self.das_speed_ms)
    }

    /// Level reached after clearing `lines` rows in total.
    ///
    /// The starting level is kept until the line count catches up with it.
    #[must_use]
    pub fn level_for_lines(&self, lines: usize) -> usize {
        let earned = lines / self.lines_per_level.max(1);
        earned.max(self.start_level).min(self.max_level)
    }

    /// Points for clearing `lines` rows at once while at `level`.
    #[must_use]
    pub fn line_clear_score(&self, lines: usize, level: usize) -> u64 {
        let base = self.line_scores[lines.min(4)];
        base.saturating_mul(level as u64 + 1)
    }

    #[must_use]
    pub fn garbage_for_lines(&self, lines: usize) -> usize {
        self.garbage_table[lines.min(4)]
    }
}

fn frames_to_ms(frames: u32) -> u64 {
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let ms = (f64::from(frames) * 1000.0 / CLASSIC_FPS).round() as u64;
    ms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        GameRules::modern().validate().unwrap();
        GameRules::classic().validate().unwrap();
    }

    #[test]
    fn gravity_never_increases_with_level() {
        for rules in [GameRules::modern(), GameRules::classic()] {
            for level in 0..=rules.max_level + 5 {
                assert!(rules.gravity_interval(level + 1) <= rules.gravity_interval(level));
            }
        }
    }

    #[test]
    fn classic_gravity_converted_from_frames() {
        let rules = GameRules::classic();
        assert_eq!(rules.gravity_ms[0], 887);
        assert_eq!(rules.gravity_ms[20], 50);
        assert_eq!(rules.gravity_interval(99), Duration::from_millis(50));
    }

    #[test]
    fn level_progression() {
        let mut rules = GameRules::classic();
        assert_eq!(rules.level_for_lines(0), 0);
        assert_eq!(rules.level_for_lines(9), 0);
        assert_eq!(rules.level_for_lines(10), 1);
        assert_eq!(rules.level_for_lines(10_000), rules.max_level);

        rules.start_level = 5;
        assert_eq!(rules.level_for_lines(0), 5);
        assert_eq!(rules.level_for_lines(59), 5);
        assert_eq!(rules.level_for_lines(60), 6);
    }

    #[test]
    fn line_clear_score_scales_with_level() {
        let rules = GameRules::classic();
        assert_eq!(rules.line_clear_score(4, 0), 1200);
        assert_eq!(rules.line_clear_score(1, 9), 400);
        assert_eq!(rules.line_clear_score(0, 9), 0);
    }

    #[test]
    fn garbage_mapping() {
        let rules = GameRules::modern();
        let sent: Vec<_> = (0..=4).map(|n| rules.garbage_for_lines(n)).collect();
        assert_eq!(sent, [0, 0, 1, 2, 4]);
    }

    #[test]
    fn validation_errors() {
        let mut rules = GameRules::modern();
        rules.gravity_ms = vec![500, 600];
        assert_eq!(rules.validate(), Err(RulesError::IncreasingGravity { level: 1 }));

        let mut rules = GameRules::modern();
        rules.gravity_ms.clear();
        assert_eq!(rules.validate(), Err(RulesError::EmptyGravityTable));

        let mut rules = GameRules::modern();
        rules.preview_count = 0;
        assert!(matches!(
            rules.validate(),
            Err(RulesError::InvalidPreviewCount { count: 0, .. })
        ));
    }

    #[test]
    fn partial_rule_file_uses_modern_defaults() {
        let rules: GameRules =
            serde_json::from_str(r#"{ "rotation_system": "classic", "lock_delay_ms": null }"#)
                .unwrap();
        assert_eq!(rules.rotation_system, RotationSystem::Classic);
        assert_eq!(rules.lock_delay(), None);
        assert_eq!(rules.preview_count, GameRules::modern().preview_count);
    }
}
