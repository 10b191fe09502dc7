use engine_config::settings::error::ConfigError;
use engine_core::error::SinkError;
use engine_runtime::error::JobError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid settings: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to run the job: {0}")]
    Job(#[from] JobError),

    #[error("Failed to open the record store: {0}")]
    Sink(#[from] SinkError),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),
}
