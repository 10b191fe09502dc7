use engine_core::error::SinkError;
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PartitionError {
    #[error("Grid size must be at least 1")]
    InvalidGridSize,

    #[error("Failed to read input file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Input file {path} is empty or contains no valid ids")]
    EmptyOrInvalidInput { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Failed to open input file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to read input record: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Transient transform failure: {0}")]
    Transient(String),

    #[error("Transformation failed: {0}")]
    Permanent(String),

    #[error("Failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum WriteError {
    /// The chunk contains a record the store cannot accept. Never retried.
    #[error("Writer rejected record at index {index}: {reason}")]
    Rejected { index: usize, reason: String },

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Failure of one transform+write attempt.
#[derive(Error, Debug)]
pub enum AttemptError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),
}

/// Terminal failure of a chunk; ends the owning partition.
#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("Chunk {chunk} of {partition_id} rejected by writer: {source}")]
    Rejected {
        partition_id: String,
        chunk: usize,
        #[source]
        source: AttemptError,
    },

    #[error("Chunk {chunk} of {partition_id} failed permanently on attempt {attempts}: {source}")]
    Permanent {
        partition_id: String,
        chunk: usize,
        attempts: usize,
        #[source]
        source: AttemptError,
    },

    #[error("Chunk {chunk} of {partition_id} failed after {attempts} attempts: {source}")]
    AttemptsExhausted {
        partition_id: String,
        chunk: usize,
        attempts: usize,
        #[source]
        source: AttemptError,
    },
}

impl ChunkError {
    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> usize {
        match self {
            ChunkError::Rejected { .. } => 1,
            ChunkError::Permanent { attempts, .. } | ChunkError::AttemptsExhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, ChunkError::Rejected { .. })
    }
}
