//! Cascara CLI - Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::process::ProcessArgs;

#[derive(Parser)]
#[command(name = "cascara")]
#[command(version)]
#[command(about = "Streaming CSS transformation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress console output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform style and markup files through the unit pipeline
    Process {
        /// Input files or directories
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output directory
        #[arg(short, long, default_value = "dist")]
        out_dir: String,

        /// Configuration file (skips per-directory discovery)
        #[arg(short, long)]
        config: Option<String>,

        /// Transformation unit to run, in order (repeatable; skips discovery)
        #[arg(short, long)]
        unit: Vec<String>,

        /// Write source-map sidecars next to outputs
        #[arg(long)]
        map: bool,

        /// Number of files processed concurrently
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },

    /// List the built-in transformation units
    Units,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = match (cli.quiet, cli.verbose) {
        (true, _) => "off",
        (false, 0) => "cascara=info",
        (false, 1) => "cascara=debug,cascara_core=debug",
        (false, _) => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Process {
            inputs,
            out_dir,
            config,
            unit,
            map,
            concurrency,
        } => commands::process::execute(ProcessArgs {
            inputs,
            out_dir,
            config,
            units: unit,
            map,
            concurrency,
        }),
        Commands::Units => commands::units::execute(),
    }
}
