//! cosmoscale: throughput control loop for Cosmos DB collections.
//!
//! Each invocation of `run` performs one pass: for every configured
//! collection it samples recent consumption, counts partitions, reads the
//! provisioned throughput, decides, and applies. Scheduling repeated passes
//! is left to cron or a timer unit.
//!
//! # Usage
//!
//! ```text
//! cosmoscale run --config cosmoscale.toml
//! cosmoscale run --config cosmoscale.toml --dry-run --log-format json
//! cosmoscale check --config cosmoscale.toml
//! cosmoscale decide --capacity 1000 --partitions 2 --threshold 0.7 600 700
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "cosmoscale",
    about = "Throughput control loop for Cosmos DB collections",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every configured collection once and apply the decisions.
    Run {
        /// Settings file.
        #[arg(short, long, default_value = "cosmoscale.toml")]
        config: PathBuf,
        /// Evaluate but never write capacity changes.
        #[arg(long)]
        dry_run: bool,
        /// Override `run.concurrency`.
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Load and validate the settings, then list the managed collections.
    Check {
        #[arg(short, long, default_value = "cosmoscale.toml")]
        config: PathBuf,
    },
    /// Run the decider offline against hand-entered numbers.
    Decide {
        /// Provisioned throughput in RU/s.
        #[arg(long)]
        capacity: u64,
        /// Physical partition count.
        #[arg(long)]
        partitions: u32,
        /// Target utilization ratio.
        #[arg(long)]
        threshold: f64,
        /// Hysteresis margin around the threshold.
        #[arg(long, default_value = "0.1")]
        increase: f64,
        /// Minimum capacity a resize may produce.
        #[arg(long = "default", default_value = "400")]
        default_value: u64,
        /// Per-partition RU/s observations, oldest first.
        #[arg(required = true)]
        samples: Vec<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Run {
            config,
            dry_run,
            concurrency,
        } => commands::run::run(&config, dry_run, concurrency).await,
        Commands::Check { config } => commands::check::check(&config),
        Commands::Decide {
            capacity,
            partitions,
            threshold,
            increase,
            default_value,
            samples,
        } => commands::decide::decide(
            capacity,
            partitions,
            cosmoscale_core::CapacityPolicy {
                threshold_rate: threshold,
                increase_rate: increase,
                default_value,
            },
            samples,
        ),
    }
}

/// Logs go to stderr so stdout carries only the pass report.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cosmoscale=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
