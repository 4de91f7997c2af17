use chrono::{DateTime, Utc};
use duelris_ai::AiProfile;
use duelris_engine::{GameRules, GameStats, MatchOutcome, MatchRules, PieceSeed, RoundRecord};
use serde::{Deserialize, Serialize};

/// Result of a headless AI-vs-AI match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    /// When the match was played (ISO 8601 format)
    pub created_at: DateTime<Utc>,
    /// Match seed; every round seed is drawn from it
    pub seed: PieceSeed,
    pub game_rules: GameRules,
    pub match_rules: MatchRules,
    pub player: ContestantReport,
    pub opponent: ContestantReport,
    pub outcome: MatchOutcome,
    /// Simulated time of the whole match, round-end pauses included
    pub duration_ms: u64,
    /// Finished rounds, oldest first
    pub rounds: Vec<RoundRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContestantReport {
    pub profile: AiProfile,
    pub wins: usize,
    /// Inputs that took effect over the whole match
    pub actions: usize,
}

/// Result of a single-board AI session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoPlayReport {
    pub created_at: DateTime<Utc>,
    pub seed: PieceSeed,
    pub game_rules: GameRules,
    pub profile: AiProfile,
    pub topped_out: bool,
    pub duration_ms: u64,
    pub actions: usize,
    pub final_stats: GameStats,
}
