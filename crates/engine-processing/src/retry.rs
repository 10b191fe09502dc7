use crate::error::{AttemptError, TransformError, WriteError};
use engine_core::{error::SinkError, retry::RetryDisposition, sink::postgres::classify_pg_error};

pub fn classify_attempt_error(err: &AttemptError) -> RetryDisposition {
    match err {
        AttemptError::Transform(e) => classify_transform_error(e),
        AttemptError::Write(e) => classify_write_error(e),
        AttemptError::Timeout(_) => RetryDisposition::Retry,
    }
}

pub fn classify_transform_error(err: &TransformError) -> RetryDisposition {
    match err {
        TransformError::Transient(_) => RetryDisposition::Retry,
        TransformError::Permanent(_) => RetryDisposition::Stop,
        TransformError::Serialization(_) => RetryDisposition::Stop,
    }
}

pub fn classify_write_error(err: &WriteError) -> RetryDisposition {
    match err {
        WriteError::Rejected { .. } => RetryDisposition::Stop,
        WriteError::Sink(sink_err) => classify_sink_error(sink_err),
    }
}

pub fn classify_sink_error(err: &SinkError) -> RetryDisposition {
    match err {
        SinkError::Io(_) | SinkError::Closed | SinkError::Tls(_) => RetryDisposition::Retry,
        SinkError::Sled(sled::Error::Io(_)) => RetryDisposition::Retry,
        SinkError::Sled(_) => RetryDisposition::Stop,
        SinkError::Postgres(pg_err) => classify_pg_error(pg_err),
        SinkError::InvalidUrl(_) => RetryDisposition::Stop,
        SinkError::Serialization(_) => RetryDisposition::Stop,
        SinkError::Other(_) => RetryDisposition::Stop,
    }
}
