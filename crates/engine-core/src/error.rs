use thiserror::Error;

/// Errors raised by a record store.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to (de)serialize row: {0}")]
    Serialization(String),

    #[error("Record store is closed")]
    Closed,

    #[error("Sink error: {0}")]
    Other(String),
}

impl From<bincode::Error> for SinkError {
    fn from(err: bincode::Error) -> Self {
        SinkError::Serialization(err.to_string())
    }
}
