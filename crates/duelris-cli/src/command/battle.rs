use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use chrono::Utc;
use duelris_ai::Difficulty;
use duelris_engine::{Match, MatchEvent, MatchOutcome, PieceSeed, RoundResult, Side};

use crate::{
    contestant::Contestant,
    schema::report::{ContestantReport, MatchReport},
    util::{self, FRAME, Output, RulesPreset},
};

/// Simulated time after which an unfinished match is abandoned.
const DEFAULT_MAX_SECONDS: u64 = 3600;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct BattleArg {
    /// Difficulty of the player side
    #[arg(long, default_value = "normal")]
    player: Difficulty,
    /// Difficulty of the opponent side
    #[arg(long, default_value = "normal")]
    opponent: Difficulty,
    /// AI profile file for the player side (JSON), overrides --player
    #[arg(long)]
    player_profile: Option<PathBuf>,
    /// AI profile file for the opponent side (JSON), overrides --opponent
    #[arg(long)]
    opponent_profile: Option<PathBuf>,
    /// Game rule preset
    #[arg(long, default_value = "modern")]
    rules: RulesPreset,
    /// Game rules file (JSON), overrides --rules
    #[arg(long)]
    rules_file: Option<PathBuf>,
    /// Match rules file (JSON)
    #[arg(long)]
    match_rules_file: Option<PathBuf>,
    /// Match seed as 32 hex characters; random if omitted
    #[arg(long)]
    seed: Option<PieceSeed>,
    /// Give up after this many seconds of simulated time
    #[arg(long)]
    max_seconds: Option<u64>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &BattleArg) -> anyhow::Result<()> {
    let BattleArg {
        player,
        opponent,
        player_profile,
        opponent_profile,
        rules,
        rules_file,
        match_rules_file,
        seed,
        max_seconds,
        output,
    } = arg;

    let game_rules = util::load_game_rules(*rules, rules_file.as_deref())?;
    let match_rules = util::load_match_rules(match_rules_file.as_deref())?;
    let profiles = [
        util::load_ai_profile(*player, player_profile.as_deref())?,
        util::load_ai_profile(*opponent, opponent_profile.as_deref())?,
    ];
    let seed = util::seed_or_random(*seed);
    let limit = Duration::from_secs(max_seconds.unwrap_or(DEFAULT_MAX_SECONDS));

    eprintln!("Starting match with seed {seed}");
    let mut game = Match::new(&game_rules, match_rules.clone(), seed)
        .context("Failed to set up the match")?;
    let mut contestants = profiles.each_ref().map(|profile| Contestant::new(profile.build()));

    let mut elapsed = Duration::ZERO;
    let outcome = loop {
        if let Some(outcome) = game.outcome() {
            break outcome;
        }
        if elapsed >= limit {
            anyhow::bail!(
                "Match did not finish within {}s of simulated time",
                limit.as_secs()
            );
        }

        if game.is_playing() {
            for side in Side::ALL {
                contestants[side.index()].play(game.board_mut(side), FRAME);
            }
        }
        game.tick(FRAME);
        elapsed += FRAME;

        let events: Vec<_> = game.drain_events().collect();
        for event in events {
            match event {
                MatchEvent::RoundStarted { round } => {
                    for contestant in &mut contestants {
                        contestant.reset();
                    }
                    eprintln!("Round {round}");
                }
                MatchEvent::RoundEnded { round, result } => {
                    print_round(&game, round, result);
                }
                MatchEvent::GarbageSent { .. } | MatchEvent::MatchEnded(_) => {}
            }
        }
    };
    eprintln!("{}", describe_outcome(outcome));

    let [player, opponent] = Side::ALL.map(|side| ContestantReport {
        profile: profiles[side.index()].clone(),
        wins: game.wins(side),
        actions: contestants[side.index()].actions(),
    });
    let report = MatchReport {
        created_at: Utc::now(),
        seed,
        game_rules,
        match_rules,
        player,
        opponent,
        outcome,
        duration_ms: util::duration_ms(elapsed),
        rounds: game.history().to_vec(),
    };
    Output::save_json(&report, output.clone())?;

    Ok(())
}

fn print_round(game: &Match, round: usize, result: RoundResult) {
    let winner = match result {
        RoundResult::Winner(side) => format!("{side} wins"),
        RoundResult::Draw => "draw".to_string(),
    };
    eprintln!(
        "  Round {round}: {winner} ({} - {})",
        game.wins(Side::Player),
        game.wins(Side::Opponent)
    );
    if let Some(record) = game.history().last() {
        for (side, stats) in [(Side::Player, &record.player), (Side::Opponent, &record.opponent)] {
            eprintln!(
                "    {side:>8}: score {:>7}, lines {:>3}, pieces {:>4}{}",
                stats.score,
                stats.lines,
                stats.pieces,
                if stats.topped_out { ", topped out" } else { "" }
            );
        }
        eprintln!("    duration {:.1}s", Duration::from_millis(record.duration_ms).as_secs_f64());
    }
}

fn describe_outcome(outcome: MatchOutcome) -> String {
    match outcome {
        MatchOutcome::Winner(side) => format!("Match won by {side}"),
        MatchOutcome::Draw => "Match drawn".to_string(),
        MatchOutcome::Disconnected(side) => format!("Match ended: {side} disconnected"),
    }
}
