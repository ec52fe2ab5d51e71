//! Lethe CLI
//!
//! Harness around the scheduling core: emits alignment fixtures, generates
//! synthetic review corpora and fits weights to a corpus.
//!
//! JSON records go to stdout (or `--output`); logs and summaries go to stderr.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lethe_core::optimizer::{CostModel, RetentionConfig, optimal_retention};
use lethe_core::records::{entries_from_logs, logs_from_entries};
use lethe_core::{
    AlignmentFile, Optimizer, OptimizerBaseline, OptimizerConfig, ReviewLog, RevlogEntry, Scheduler,
    SchedulerConfig, SyntheticCorpus, Weights,
};

/// Lethe - memory-decay scheduling harness
#[derive(Parser, Debug)]
#[command(name = "lethe")]
#[command(author = "Lethe Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Harness for the Lethe FSRS-6 scheduler and optimizer")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay the reference scenarios and print the alignment record
    Alignment {
        /// Scheduler config (JSON); fuzzing is always disabled
        #[arg(long)]
        config: Option<PathBuf>,
        /// Start time of every scenario
        #[arg(long, default_value = "2025-06-15T10:00:00Z")]
        t0: DateTime<Utc>,
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Generate a synthetic review-log corpus
    Simulate {
        /// Weights the simulated learners follow (JSON array of 21 numbers)
        #[arg(long)]
        weights: Option<PathBuf>,
        #[arg(long, default_value_t = 500)]
        cards: usize,
        #[arg(long, default_value_t = 10)]
        reviews: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Fit weights to a corpus and print the optimizer baseline record
    Optimize {
        /// Review-log corpus (JSON array of entries)
        corpus: PathBuf,
        /// Optimizer config (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the number of epochs
        #[arg(long)]
        epochs: Option<usize>,
        /// Override the mini batch size
        #[arg(long)]
        batch_size: Option<usize>,
        /// Weights the corpus was generated from, recorded in the baseline
        #[arg(long)]
        true_weights: Option<PathBuf>,
        /// Skip the optimal retention search
        #[arg(long)]
        skip_retention: bool,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match cli.command {
        Commands::Alignment { config, t0, output } => run_alignment(config, t0, output),
        Commands::Simulate {
            weights,
            cards,
            reviews,
            seed,
            output,
        } => run_simulate(weights, cards, reviews, seed, output),
        Commands::Optimize {
            corpus,
            config,
            epochs,
            batch_size,
            true_weights,
            skip_retention,
            output,
        } => run_optimize(
            corpus,
            config,
            epochs,
            batch_size,
            true_weights,
            skip_retention,
            output,
        ),
    }
}

/// Logs go to stderr so stdout stays clean for JSON records
fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.with_ansi(false).init();
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_alignment(config: Option<PathBuf>, t0: DateTime<Utc>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let config = match config {
        Some(path) => read_json::<SchedulerConfig>(&path)?,
        None => SchedulerConfig::default(),
    };
    let scheduler = Scheduler::new(config.without_fuzzing())?;
    let file = AlignmentFile::generate(&scheduler, t0)?;
    info!(scenarios = file.scenarios.len(), "Generated alignment scenarios");
    write_json(&file, output.as_deref())
}

fn run_simulate(
    weights: Option<PathBuf>,
    cards: usize,
    reviews: usize,
    seed: u64,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let weights = load_weights(weights.as_deref())?;
    let corpus = SyntheticCorpus {
        num_cards: cards,
        reviews_per_card: reviews,
        seed,
        ..SyntheticCorpus::default()
    };
    let logs = corpus.generate(&weights)?;
    info!(cards, logs = logs.len(), "Generated synthetic corpus");
    write_json(&entries_from_logs(&logs), output.as_deref())
}

fn run_optimize(
    corpus: PathBuf,
    config: Option<PathBuf>,
    epochs: Option<usize>,
    batch_size: Option<usize>,
    true_weights: Option<PathBuf>,
    skip_retention: bool,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = match config {
        Some(path) => read_json::<OptimizerConfig>(&path)?,
        None => OptimizerConfig::default(),
    };
    if let Some(epochs) = epochs {
        config.epochs = epochs;
    }
    if let Some(batch_size) = batch_size {
        config.mini_batch_size = batch_size;
    }

    let logs = load_corpus(&corpus)?;
    info!(logs = logs.len(), path = %corpus.display(), "Loaded corpus");

    let optimizer = Optimizer::new(config)?;
    let fit = optimizer.fit(&logs, Weights::default())?;
    let default_loss = optimizer.batch_loss(&Weights::default(), &logs)?;

    let retention = if skip_retention {
        None
    } else {
        match CostModel::from_logs(&logs) {
            Ok(cost_model) => Some(optimal_retention(&fit.weights, &cost_model, &RetentionConfig::default())?),
            Err(e) => {
                warn!(error = %e, "Skipping optimal retention");
                None
            }
        }
    };

    print_fit_summary(fit.loss, default_loss, fit.epochs_run, fit.converged, retention);

    let baseline = OptimizerBaseline {
        true_parameters: load_weights(true_weights.as_deref())?,
        optimized_parameters: fit.weights,
        batch_loss: fit.loss,
        default_loss,
        optimal_retention: retention,
    };
    write_json(&baseline, output.as_deref())
}

fn print_fit_summary(loss: f64, default_loss: f64, epochs: usize, converged: bool, retention: Option<f64>) {
    eprintln!("{}", "=== Lethe Fit ===".cyan().bold());
    eprintln!("{}: {:.6}", "Fitted Loss".white().bold(), loss);
    eprintln!("{}: {:.6}", "Default Loss".white().bold(), default_loss);
    eprintln!("{}: {}", "Epochs".white().bold(), epochs);
    eprintln!(
        "{}: {}",
        "Converged".white().bold(),
        if converged { "yes".green() } else { "no".yellow() }
    );
    match retention {
        Some(r) => eprintln!("{}: {:.3}", "Optimal Retention".white().bold(), r),
        None => eprintln!("{}: {}", "Optimal Retention".white().bold(), "n/a".dimmed()),
    }
}

// ============================================================================
// I/O
// ============================================================================

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing {}", path.display()))
}

fn load_weights(path: Option<&Path>) -> anyhow::Result<Weights> {
    let Some(path) = path else {
        return Ok(Weights::default());
    };
    let values: Vec<f64> = read_json(path)?;
    let weights = Weights::from_slice(&values)?;
    weights.validate()?;
    Ok(weights)
}

fn load_corpus(path: &Path) -> anyhow::Result<Vec<ReviewLog>> {
    let entries: Vec<RevlogEntry> = read_json(path)?;
    Ok(logs_from_entries(entries)?)
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writeln!(writer)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            serde_json::to_writer_pretty(&mut writer, value)?;
            writeln!(writer)?;
            writer.flush()?;
        }
    }
    Ok(())
}
