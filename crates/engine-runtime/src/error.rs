use engine_config::settings::error::ConfigError;
use engine_processing::error::PartitionError;
use thiserror::Error;

/// Errors that stop a job before any partition runs.
///
/// Failures inside a partition never surface here; they are reported on the
/// partition's result instead.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Partitioning failed: {0}")]
    Partition(#[from] PartitionError),

    /// The partitioning task panicked or was cancelled.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
