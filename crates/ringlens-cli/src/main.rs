//! CLI for batch AML analysis over transaction CSVs.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ringlens_engine::{AnalysisConfig, FraudAnalyzer, ProgressCallback};

#[derive(Parser)]
#[command(name = "ringlens")]
#[command(about = "Transaction-graph AML analytics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a transaction batch and emit the JSON fraud report
    Analyze {
        /// Path to the transactions CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to a YAML analysis configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Enable the deep money-laundering chain detector
        #[arg(long)]
        deep_chains: bool,

        /// Override the enumerated-cycle cap
        #[arg(long)]
        max_cycles: Option<usize>,

        /// Skip invalid rows instead of failing on the first one
        #[arg(long)]
        lenient: bool,

        /// Suppress the progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Validate a transactions CSV without running the analysis
    Validate {
        /// Path to the transactions CSV
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .init();

    match cli.command {
        Commands::Analyze {
            input,
            output,
            config,
            deep_chains,
            max_cycles,
            lenient,
            quiet,
        } => analyze(
            input, output, config, deep_chains, max_cycles, lenient, quiet,
        ),
        Commands::Validate { input } => validate(input),
    }
}

#[allow(clippy::too_many_arguments)]
fn analyze(
    input: PathBuf,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
    deep_chains: bool,
    max_cycles: Option<usize>,
    lenient: bool,
    quiet: bool,
) -> Result<()> {
    let mut config = load_config(config_path.as_deref())?;
    if deep_chains {
        config.enable_deep_chain_analysis = true;
    }
    if let Some(cap) = max_cycles {
        config.max_cycles = cap;
    }

    let transactions = if lenient {
        let file = fs::File::open(&input)
            .with_context(|| format!("opening {}", input.display()))?;
        let summary = ringlens_ingest::read_transactions_lenient(file)?;
        if !summary.rejected.is_empty() {
            warn!(
                rejected = summary.rejected.len(),
                "skipped invalid rows in lenient mode"
            );
        }
        summary.transactions
    } else {
        ringlens_ingest::read_transactions(&input)?
    };
    info!(transactions = transactions.len(), "batch ingested");

    let mut analyzer = FraudAnalyzer::new(config);
    if !quiet {
        analyzer = analyzer.with_progress(progress_bar_callback());
    }

    let report = analyzer.analyze(transactions)?;
    let json = serde_json::to_string_pretty(&report)?;

    match output {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(report = %path.display(), "report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn validate(input: PathBuf) -> Result<()> {
    let transactions = ringlens_ingest::read_transactions(&input)?;
    println!("OK: {} valid transactions", transactions.len());
    Ok(())
}

/// Loads the YAML configuration, falling back to defaults.
fn load_config(path: Option<&std::path::Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
        }
        None => Ok(AnalysisConfig::default()),
    }
}

/// Bridges engine milestones onto an indicatif bar.
fn progress_bar_callback() -> ProgressCallback {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}%")
            .expect("Progress bar template should be valid - uses only standard indicatif placeholders")
            .progress_chars("#>-"),
    );
    Box::new(move |message, percent| {
        pb.set_message(message.to_string());
        pb.set_position(percent as u64);
        if percent >= 100 {
            pb.finish_with_message("done");
        }
    })
}
