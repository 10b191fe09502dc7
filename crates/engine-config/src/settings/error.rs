use std::path::PathBuf;
use thiserror::Error;

/// Errors raised when loading or validating engine settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML or has unknown keys.
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its allowed range.
    #[error("Invalid setting '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}
