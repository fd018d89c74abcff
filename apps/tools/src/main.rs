use std::io::Read;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dashboard_core::{classify, profile_to_schedule, schedule::validate_checkpoints, schedule_to_profile};
use serde::Deserialize;
use shared::domain::{Checkpoint, Profile, Segment};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Checkpoints (`[[seconds, temp], ...]` or a stored profile record) to segments.
    Schedule {
        /// JSON input; read from stdin when omitted or `-`.
        input: Option<String>,
    },
    /// Segments (`[[rate, target, hold], ...]`) to checkpoints.
    Profile {
        #[arg(long, default_value_t = 20.0)]
        start_temp: f64,
        input: Option<String>,
    },
    /// Cone equivalent of a peak temperature (°C) reached at a rate (°C/h).
    Cone {
        temperature: f64,
        #[arg(allow_negative_numbers = true)]
        rate: f64,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CheckpointInput {
    Record(Profile),
    Points(Vec<Checkpoint>),
}

impl CheckpointInput {
    fn into_points(self) -> Vec<Checkpoint> {
        match self {
            Self::Record(profile) => profile.data,
            Self::Points(points) => points,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    println!("{}", execute(cli.command)?);
    Ok(())
}

fn execute(command: Command) -> Result<String> {
    match command {
        Command::Schedule { input } => {
            let raw = read_input(input)?;
            let points = serde_json::from_str::<CheckpointInput>(&raw)
                .context("expected a checkpoint array or a profile record")?
                .into_points();
            validate_checkpoints(&points)?;
            let segments = profile_to_schedule(&points);
            debug!(points = points.len(), segments = segments.len(), "converted profile");
            Ok(serde_json::to_string(&segments)?)
        }
        Command::Profile { start_temp, input } => {
            let raw = read_input(input)?;
            let segments: Vec<Segment> =
                serde_json::from_str(&raw).context("expected a segment array")?;
            let points = schedule_to_profile(&segments, start_temp)?;
            Ok(serde_json::to_string(&points)?)
        }
        Command::Cone { temperature, rate } => Ok(classify(temperature, rate)),
    }
}

fn read_input(input: Option<String>) -> Result<String> {
    match input.as_deref() {
        Some(raw) if raw != "-" => Ok(raw.to_string()),
        _ => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read stdin")?;
            Ok(raw)
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
