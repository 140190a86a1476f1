//! Settings and holdback table loading shared across commands.

use std::path::Path;

use preloading::config::PreloadingConfig;
use preloading::settings::Settings;

use crate::error::CliError;

/// Load settings from `path`, or the defaults when no file is given.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    match path {
        Some(path) => Ok(Settings::load(path)?),
        None => Ok(Settings::default()),
    }
}

/// Load the holdback table, preferring an explicit file over settings.
pub fn load_config(settings: &Settings, file: Option<&Path>) -> Result<PreloadingConfig, CliError> {
    match file {
        Some(path) => Ok(PreloadingConfig::load(path)?),
        None => Ok(settings.load_preloading_config()?),
    }
}
