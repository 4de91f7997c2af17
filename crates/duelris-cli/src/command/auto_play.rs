use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use chrono::Utc;
use duelris_ai::Difficulty;
use duelris_engine::{Board, BoardEvent, PieceSeed};

use crate::{
    contestant::Contestant,
    schema::report::AutoPlayReport,
    util::{self, FRAME, Output, RulesPreset},
};

const DEFAULT_MAX_PIECES: usize = 1000;
const PROGRESS_INTERVAL: usize = 100;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct AutoPlayArg {
    /// AI difficulty
    #[arg(long, default_value = "normal")]
    ai: Difficulty,
    /// AI profile file (JSON), overrides --ai
    #[arg(long)]
    profile: Option<PathBuf>,
    /// Game rule preset
    #[arg(long, default_value = "modern")]
    rules: RulesPreset,
    /// Game rules file (JSON), overrides --rules
    #[arg(long)]
    rules_file: Option<PathBuf>,
    /// Piece seed as 32 hex characters; random if omitted
    #[arg(long)]
    seed: Option<PieceSeed>,
    /// Stop after this many locked pieces
    #[arg(long)]
    max_pieces: Option<usize>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &AutoPlayArg) -> anyhow::Result<()> {
    let AutoPlayArg {
        ai,
        profile,
        rules,
        rules_file,
        seed,
        max_pieces,
        output,
    } = arg;

    let game_rules = util::load_game_rules(*rules, rules_file.as_deref())?;
    let profile = util::load_ai_profile(*ai, profile.as_deref())?;
    let seed = util::seed_or_random(*seed);
    let max_pieces = max_pieces.unwrap_or(DEFAULT_MAX_PIECES);

    eprintln!("Auto-play with seed {seed}");
    let mut board = Board::new(game_rules.clone(), seed).context("Failed to set up the board")?;
    let mut contestant = Contestant::new(profile.build());

    let mut elapsed = Duration::ZERO;
    while !board.is_game_over() && board.stats().pieces() < max_pieces {
        contestant.play(&mut board, FRAME);
        board.tick(FRAME);
        elapsed += FRAME;

        let events: Vec<_> = board.drain_events().collect();
        for event in events {
            match event {
                BoardEvent::LevelUp { level } => eprintln!("  level {level}"),
                BoardEvent::PieceLocked(_) if board.stats().pieces() % PROGRESS_INTERVAL == 0 => {
                    let stats = board.stats();
                    eprintln!(
                        "{} pieces, {} lines, score {}",
                        stats.pieces(),
                        stats.lines(),
                        stats.score()
                    );
                }
                _ => {}
            }
        }
    }

    let stats = board.stats();
    eprintln!(
        "Finished after {:.1}s: {} pieces, {} lines, score {}{}",
        elapsed.as_secs_f64(),
        stats.pieces(),
        stats.lines(),
        stats.score(),
        if board.is_game_over() { " (topped out)" } else { "" }
    );

    let report = AutoPlayReport {
        created_at: Utc::now(),
        seed,
        game_rules,
        profile,
        topped_out: board.is_game_over(),
        duration_ms: util::duration_ms(elapsed),
        actions: contestant.actions(),
        final_stats: stats.clone(),
    };
    Output::save_json(&report, output.clone())?;

    Ok(())
}
