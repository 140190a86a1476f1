//! Holdback table CLI commands.
//!
//! Provides `config lookup` and `config validate`.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use preloading::config::{ConfigEntry, ParseReport, PreloadingConfig};
use preloading::settings::Settings;
use preloading::types::{predictors, PreloadingType};

use super::common::load_config;
use crate::error::{read_file, CliError};

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the holdback and sampling entry for a (type, predictor) key
    Lookup {
        /// Preloading type (Preconnect, Prefetch, Prerender, NoStatePrefetch)
        #[arg(long = "type")]
        preloading_type: String,

        /// Predictor name as used in the table (e.g. SpeculationRules)
        #[arg(long)]
        predictor: String,

        /// Holdback table to read instead of the one named in settings
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Check a holdback table and report skipped entries
    Validate {
        /// Holdback table (JSON array)
        #[arg(long)]
        file: PathBuf,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, settings: &Settings) -> Result<(), CliError> {
    match command {
        ConfigCommands::Lookup {
            preloading_type,
            predictor,
            file,
        } => {
            let config = load_config(settings, file.as_deref())?;
            let entry = lookup(&config, &preloading_type, &predictor)?;
            if predictors::by_name(&predictor).is_none() {
                tracing::warn!(predictor = %predictor, "Not a well-known predictor name");
            }
            println!("[{} / {}]", preloading_type, predictor);
            println!("  holdback = {}", entry.holdback);
            println!("  sampling_likelihood = {}", entry.sampling_likelihood);
            Ok(())
        }
        ConfigCommands::Validate { file } => {
            let report = validate(&file)?;
            println!(
                "{}: {} accepted, {} skipped",
                file.display(),
                report.accepted,
                report.skipped
            );
            if report.skipped > 0 {
                return Err(CliError::Config(format!(
                    "{} malformed entries in {}",
                    report.skipped,
                    file.display()
                )));
            }
            Ok(())
        }
    }
}

/// Resolve one key, rejecting unknown preloading types.
fn lookup(
    config: &PreloadingConfig,
    preloading_type: &str,
    predictor: &str,
) -> Result<ConfigEntry, CliError> {
    let preloading_type: PreloadingType = preloading_type.parse().map_err(CliError::Config)?;
    Ok(config.entry(preloading_type.as_str(), predictor))
}

/// Parse a table, failing only if it is not a JSON array.
fn validate(path: &Path) -> Result<ParseReport, CliError> {
    let json = read_file(path)?;
    serde_json::from_str::<Vec<serde_json::Value>>(&json).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let (_, report) = PreloadingConfig::parse_with_report(&json);
    Ok(report)
}
