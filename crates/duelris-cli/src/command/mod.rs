use clap::{Parser, Subcommand};

use self::{
    auto_play::AutoPlayArg,
    battle::BattleArg,
    show::{AiProfileArg, RulesArg},
};

mod auto_play;
mod battle;
mod show;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Run a headless AI-vs-AI match
    Battle(#[clap(flatten)] BattleArg),
    /// Let an AI play a single board until it tops out
    #[command(name = "auto-play")]
    AutoPlay(#[clap(flatten)] AutoPlayArg),
    /// Print a game rule preset as JSON
    Rules(#[clap(flatten)] RulesArg),
    /// Print an AI difficulty preset as JSON
    AiProfile(#[clap(flatten)] AiProfileArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode.unwrap_or(Mode::Battle(BattleArg::default())) {
        Mode::Battle(arg) => battle::run(&arg)?,
        Mode::AutoPlay(arg) => auto_play::run(&arg)?,
        Mode::Rules(arg) => show::run_rules(&arg)?,
        Mode::AiProfile(arg) => show::run_ai_profile(&arg)?,
    }
    Ok(())
}
