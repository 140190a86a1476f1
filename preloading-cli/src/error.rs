//! CLI error type.

use std::path::PathBuf;

use preloading::error::{ConfigError, LoggingError};
use thiserror::Error;

/// Errors surfaced to the command line.
#[derive(Debug, Error)]
pub enum CliError {
    /// A settings or holdback file could not be loaded.
    #[error("{0}")]
    Settings(#[from] ConfigError),

    /// Logging could not be initialized.
    #[error("{0}")]
    Logging(#[from] LoggingError),

    /// A file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON input file is malformed.
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid command arguments or input contents.
    #[error("{0}")]
    Config(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Json { .. } => 2,
            _ => 1,
        }
    }
}

/// Read a file, naming it in the error.
pub fn read_file(path: &std::path::Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}
