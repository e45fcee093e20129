//! Evloop CLI
//!
//! Drives a single event loop from the command line: push a synthetic
//! workload through both lanes and report what the loop did with it.

use clap::{Parser, Subcommand};
use evloop_cli::commands;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "evloop")]
#[command(about = "Single-worker event loop driver", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a workload to a fresh loop and print its statistics
    Run {
        /// TOML file with loop settings
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the loop (worker thread) name
        #[arg(long)]
        name: Option<String>,
        /// Override the per-lane bound
        #[arg(long)]
        max_queue_size: Option<usize>,
        /// Number of immediate tasks to submit
        #[arg(long, default_value_t = 1000)]
        immediate: usize,
        /// Number of delayed tasks to submit
        #[arg(long, default_value_t = 100)]
        delayed: usize,
        /// Delay applied to every delayed task, in milliseconds
        #[arg(long, default_value_t = 10)]
        delay_ms: u64,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective loop configuration as TOML
    Config {
        /// TOML file with loop settings
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            name,
            max_queue_size,
            immediate,
            delayed,
            delay_ms,
            json,
        } => commands::run::execute(commands::run::RunArgs {
            config,
            name,
            max_queue_size,
            immediate,
            delayed,
            delay_ms,
            json,
        }),

        Commands::Config { config } => commands::config::execute(config.as_deref()),
    }
}
