use std::path::PathBuf;

use duelris_ai::{AiProfile, Difficulty};

use crate::util::{Output, RulesPreset};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct RulesArg {
    /// Game rule preset
    #[arg(long, default_value = "modern")]
    preset: RulesPreset,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct AiProfileArg {
    /// AI difficulty
    #[arg(long, default_value = "normal")]
    difficulty: Difficulty,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run_rules(arg: &RulesArg) -> anyhow::Result<()> {
    let RulesArg { preset, output } = arg;
    Output::save_json(&preset.rules(), output.clone())
}

pub(crate) fn run_ai_profile(arg: &AiProfileArg) -> anyhow::Result<()> {
    let AiProfileArg { difficulty, output } = arg;
    Output::save_json(&AiProfile::from_difficulty(*difficulty), output.clone())
}
