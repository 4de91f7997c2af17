use std::{
    fs::File,
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use duelris_ai::{AiProfile, Difficulty};
use duelris_engine::{GameRules, MatchRules, PieceSeed};
use rand::Rng as _;

/// Simulated time step of the headless loops (60 Hz).
pub const FRAME: Duration = Duration::from_nanos(16_666_667);

/// Where a JSON report goes: a file when a path is given, stdout otherwise.
#[derive(Debug)]
pub enum Output {
    Stdout(StdoutLock<'static>),
    File(BufWriter<File>, PathBuf),
}

impl Output {
    /// Writes `value` as pretty JSON to `path`, or to stdout.
    pub fn save_json<T>(value: &T, path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = Output::create(path)?;
        output
            .write_json(value)
            .with_context(|| format!("Failed to write JSON to {}", output.name()))?;
        if let Output::File(_, path) = &output {
            eprintln!("Saved {}", path.display());
        }
        Ok(())
    }

    pub fn create(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Output::Stdout(io::stdout().lock()));
        };
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File(BufWriter::new(file), path))
    }

    pub fn name(&self) -> String {
        match self {
            Output::Stdout(_) => "stdout".to_owned(),
            Output::File(_, path) => path.display().to_string(),
        }
    }

    fn write_json<T>(&mut self, value: &T) -> io::Result<()>
    where
        T: serde::Serialize,
    {
        serde_json::to_writer_pretty(&mut *self, value)?;
        writeln!(self)?;
        self.flush()
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(writer) => writer.write(buf),
            Output::File(writer, _) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(writer) => writer.flush(),
            Output::File(writer, _) => writer.flush(),
        }
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {file_kind} file: {}", path.display()))?;
    serde_json::from_reader(io::BufReader::new(file))
        .with_context(|| format!("Failed to parse {file_kind} file: {}", path.display()))
}

/// Built-in game rule sets.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum RulesPreset {
    Classic,
    #[default]
    Modern,
}

impl RulesPreset {
    pub fn rules(self) -> GameRules {
        match self {
            RulesPreset::Classic => GameRules::classic(),
            RulesPreset::Modern => GameRules::modern(),
        }
    }
}

/// Loads game rules from `path`, or takes the preset when no file is given.
pub fn load_game_rules(preset: RulesPreset, path: Option<&Path>) -> anyhow::Result<GameRules> {
    let rules = match path {
        Some(path) => read_json_file("game rules", path)?,
        None => preset.rules(),
    };
    rules.validate().context("Invalid game rules")?;
    Ok(rules)
}

pub fn load_match_rules(path: Option<&Path>) -> anyhow::Result<MatchRules> {
    let rules = match path {
        Some(path) => read_json_file("match rules", path)?,
        None => MatchRules::default(),
    };
    rules.validate().context("Invalid match rules")?;
    Ok(rules)
}

/// Loads an AI profile from `path`, or the preset for `difficulty`.
pub fn load_ai_profile(difficulty: Difficulty, path: Option<&Path>) -> anyhow::Result<AiProfile> {
    match path {
        Some(path) => read_json_file("AI profile", path),
        None => Ok(AiProfile::from_difficulty(difficulty)),
    }
}

pub fn seed_or_random(seed: Option<PieceSeed>) -> PieceSeed {
    seed.unwrap_or_else(|| rand::rng().random())
}

#[expect(clippy::cast_possible_truncation)]
pub fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis() as u64
}
