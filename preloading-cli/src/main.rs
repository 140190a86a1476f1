//! Preloading CLI
//!
//! Inspects holdback tables and replays speculation candidate batches
//! through the prerender reconciler.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use preloading::logging::{init_logging, LoggingConfig};

use commands::config::ConfigCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "preloading")]
#[command(version = preloading::VERSION)]
#[command(about = "Speculative preloading coordination tools", long_about = None)]
struct Cli {
    /// Settings file (INI)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Inspect and validate holdback tables
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Replay candidate batches and print prerender starts and cancels
    Reconcile {
        /// JSON array of candidate batches
        #[arg(long)]
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = commands::common::load_settings(cli.settings.as_deref())?;

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        settings.preloading.log_level.clone()
    };
    // Keep the guard alive until exit so file logs are flushed.
    let _guard = init_logging(&LoggingConfig::default().with_default_level(level))?;

    match cli.command {
        Commands::Config(command) => commands::config::run(command, &settings),
        Commands::Reconcile { input } => commands::reconcile::run(&input, &settings),
    }
}
