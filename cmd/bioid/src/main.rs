//! bioid - enroll and identify precomputed face or voice embeddings.

mod config;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bioid_recognizer::{DEFAULT_TOP_K, Precomputed, Prediction, Recognizer, RecognizerConfig};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::Config;

/// Enroll and identify biometric embeddings.
///
/// Embedding files are JSON arrays of numbers. Each modality keeps its
/// own store; the default location is under the user data directory.
#[derive(Parser, Debug)]
#[command(name = "bioid")]
#[command(about = "Enroll and identify face or voice embeddings")]
#[command(version)]
struct Cli {
    /// Config file (YAML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Which modality store to use
    #[arg(short, long, global = true, value_enum, default_value_t = Modality::Face)]
    modality: Modality,

    /// Override the store path
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Override the match threshold (cosine distance, 0..=2)
    #[arg(long, global = true)]
    threshold: Option<f32>,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Modality {
    Face,
    Voice,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enroll an embedding under a label, replacing any previous one
    Enroll { label: String, file: PathBuf },
    /// Rank enrolled labels by distance to an embedding
    Query {
        file: PathBuf,
        /// Maximum number of results
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Print the matching label, or "unknown"
    Predict { file: PathBuf },
    /// Print the embedding enrolled under a label
    Get { label: String },
    /// Remove a label
    Remove { label: String },
    /// List enrolled labels
    List,
}

#[derive(Debug, Serialize)]
struct Ranked<'a> {
    label: &'a str,
    distance: f32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    run(&cli, &mut std::io::stdout().lock())
}

/// Executes one command, writing its result to `out`.
fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let cfg = recognizer_config(cli)?;
    debug!(modality = ?cli.modality, path = %cfg.store_path.display(), "bioid: config resolved");
    let rec = Recognizer::open(&cfg, Precomputed)
        .with_context(|| format!("open store {}", cfg.store_path.display()))?;

    match &cli.command {
        Command::Enroll { label, file } => {
            let embedding = read_embedding(file)?;
            rec.add(label, &embedding)?;
            rec.store().flush()?;
            writeln!(out, "enrolled {label}")?;
        }
        Command::Query { file, top_k } => {
            let embedding = read_embedding(file)?;
            let matches = rec.query(&embedding, *top_k)?;
            let ranked: Vec<Ranked> = matches
                .iter()
                .map(|m| Ranked {
                    label: &m.key,
                    distance: m.distance,
                })
                .collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&ranked)?)?;
        }
        Command::Predict { file } => {
            let embedding = read_embedding(file)?;
            let prediction = rec.predict(&embedding)?;
            if let Prediction::Known { distance, .. } = &prediction {
                debug!(distance, "bioid: matched");
            }
            writeln!(out, "{prediction}")?;
        }
        Command::Get { label } => {
            let embedding = rec.embedding(label)?;
            writeln!(out, "{}", serde_json::to_string(&embedding)?)?;
        }
        Command::Remove { label } => {
            rec.remove(label)?;
            rec.store().flush()?;
            writeln!(out, "removed {label}")?;
        }
        Command::List => {
            writeln!(out, "{}", serde_json::to_string_pretty(&rec.labels()?)?)?;
        }
    }
    Ok(())
}

/// Picks the modality section of the config file and applies flag overrides.
fn recognizer_config(cli: &Cli) -> Result<RecognizerConfig> {
    let file = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let mut cfg = match cli.modality {
        Modality::Face => file.face,
        Modality::Voice => file.voice,
    };
    if let Some(path) = &cli.store {
        cfg = cfg.with_store_path(path);
    }
    if let Some(threshold) = cli.threshold {
        cfg = cfg.with_threshold(threshold);
    }
    Ok(cfg)
}

fn read_embedding(path: &Path) -> Result<Vec<f32>> {
    let data = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    parse_embedding(&data).with_context(|| format!("parse embedding {}", path.display()))
}

fn parse_embedding(data: &[u8]) -> Result<Vec<f32>> {
    let embedding: Vec<f32> = serde_json::from_slice(data)?;
    Ok(embedding)
}
