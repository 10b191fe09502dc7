use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Parameters supplied by whoever launches a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParameters {
    pub input_file: PathBuf,
    /// Only distinguishes repeated invocations; partitioning ignores it.
    pub timestamp: i64,
}

impl JobParameters {
    pub fn new(input_file: impl Into<PathBuf>) -> Self {
        JobParameters {
            input_file: input_file.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
