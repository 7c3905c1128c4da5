mod replay;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use canvas::config::{ConfigError, EngineConfig};
use clap::{Parser, Subcommand};

#[derive(Debug, thiserror::Error)]
enum ReplayError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid JSON in {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to encode action: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write output: {0}")]
    Write(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "planmark", about = "Replay and inspect plan markup canvas sessions")]
struct Cli {
    /// Engine config file (JSON), merged over the defaults.
    #[arg(long, env = "PLANMARK_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Feed a recorded session through the engine and print every action as a JSON line.
    Replay {
        #[arg(env = "PLANMARK_SESSION")]
        session: PathBuf,
    },
    /// Validate a config file and print the merged result.
    CheckConfig { file: PathBuf },
}

fn main() -> Result<(), ReplayError> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Replay { session } => run_replay(&session, cli.config.as_deref()),
        Command::CheckConfig { file } => {
            let config = load_config(Some(&file))?;
            print_json(&config)
        }
    }
}

fn run_replay(session_path: &Path, config_path: Option<&Path>) -> Result<(), ReplayError> {
    let config = load_config(config_path)?;
    let session: replay::Session = read_json(session_path)?;
    tracing::info!(path = %session_path.display(), events = session.events.len(), "replaying session");

    let report = replay::replay(session, config);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for action in &report.actions {
        writeln!(out, "{}", serde_json::to_string(action)?)?;
    }
    out.flush()?;

    tracing::info!(
        actions = report.actions.len(),
        commits = report.commits,
        warnings = report.warnings,
        entities = report.snapshot.equipment.len()
            + report.snapshot.lines.len()
            + report.snapshot.zones.len()
            + report.snapshot.containment.len()
            + report.snapshot.roof_masks.len()
            + report.snapshot.pv_arrays.len(),
        "replay finished"
    );
    Ok(())
}

/// Defaults when `path` is `None`; the file merged over them otherwise.
fn load_config(path: Option<&Path>) -> Result<EngineConfig, ReplayError> {
    let config = match path {
        Some(path) => read_json(path)?,
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ReplayError> {
    let text = fs::read_to_string(path).map_err(|source| ReplayError::Read { path: path.to_owned(), source })?;
    serde_json::from_str(&text).map_err(|source| ReplayError::Parse { path: path.to_owned(), source })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), ReplayError> {
    let text = serde_json::to_string_pretty(value)?;
    writeln!(io::stdout(), "{text}")?;
    Ok(())
}
