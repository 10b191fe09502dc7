use crate::error::WriteError;
use chrono::Utc;
use engine_core::{metrics::Metrics, sink::RecordSink};
use model::records::{
    processed::{ProcessedRow, RecordStatus},
    record::Record,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteResult {
    pub rows_written: usize,
    pub duration: Duration,
}

/// Persists transformed records as one atomic upsert per chunk.
#[derive(Clone)]
pub struct ChunkWriter {
    sink: Arc<dyn RecordSink>,
    metrics: Metrics,
}

impl ChunkWriter {
    pub fn new(sink: Arc<dyn RecordSink>, metrics: Metrics) -> Self {
        Self { sink, metrics }
    }

    /// Upserts every record or none of them. A record without an `id`
    /// rejects the whole chunk before anything reaches the sink.
    pub async fn write(&self, records: &[Record]) -> Result<WriteResult, WriteError> {
        let start = std::time::Instant::now();
        if records.is_empty() {
            return Ok(WriteResult {
                rows_written: 0,
                duration: start.elapsed(),
            });
        }

        let rows = match Self::to_rows(records) {
            Ok(rows) => rows,
            Err(err) => {
                self.metrics.increment_failures(1);
                warn!(error = %err, sink = self.sink.name(), "Chunk rejected");
                return Err(err);
            }
        };

        if let Err(err) = self.sink.upsert_batch(&rows).await {
            self.metrics.increment_failures(1);
            warn!(error = %err, sink = self.sink.name(), rows = rows.len(), "Chunk write failed");
            return Err(err.into());
        }

        let rows_written = rows.len();
        self.metrics.increment_records(rows_written as u64);
        self.metrics.increment_chunks(1);

        let duration = start.elapsed();
        debug!(
            sink = self.sink.name(),
            rows = rows_written,
            duration_ms = duration.as_millis(),
            "Chunk written"
        );

        Ok(WriteResult {
            rows_written,
            duration,
        })
    }

    fn to_rows(records: &[Record]) -> Result<Vec<ProcessedRow>, WriteError> {
        let processed_at = Utc::now();
        records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let id = record.id.ok_or_else(|| WriteError::Rejected {
                    index,
                    reason: "record has no id".into(),
                })?;
                Ok(ProcessedRow {
                    id,
                    payload: record.payload.clone().unwrap_or_else(|| "null".to_owned()),
                    processed_at,
                    status: RecordStatus::Processed,
                })
            })
            .collect()
    }
}
