use crate::{
    consumer::chunk_writer::ChunkWriter,
    error::{AttemptError, ChunkError, WriteError},
    executor::state::ChunkState,
    retry::classify_attempt_error,
    transform::Transformer,
};
use engine_core::{
    metrics::Metrics,
    retry::{RetryDisposition, RetryPolicy},
};
use model::records::{chunk::Chunk, record::Record};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Counters of a committed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkStats {
    pub read: u64,
    pub written: u64,
    pub filtered: u64,
    pub attempts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    Committed(ChunkStats),
    /// The job was aborted before the chunk could be committed.
    Aborted { attempts: usize },
}

/// Runs transform + write for one chunk under the retry policy.
///
/// The chunk's records are read once by the caller; every attempt transforms
/// them again from scratch, so a failed attempt leaves nothing behind.
#[derive(Clone)]
pub struct ChunkExecutor {
    transformer: Arc<dyn Transformer>,
    writer: ChunkWriter,
    retry: RetryPolicy,
    attempt_timeout: Option<Duration>,
    metrics: Metrics,
    cancel: CancellationToken,
}

impl ChunkExecutor {
    pub fn new(
        transformer: Arc<dyn Transformer>,
        writer: ChunkWriter,
        retry: RetryPolicy,
        metrics: Metrics,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transformer,
            writer,
            retry,
            attempt_timeout: None,
            metrics,
            cancel,
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn execute(&self, chunk: &Chunk) -> Result<ChunkOutcome, ChunkError> {
        let mut state = ChunkState::Pending;
        let mut attempt = 0;

        loop {
            if self.cancel.is_cancelled() {
                self.advance(chunk, &mut state, ChunkState::Aborted);
                return Ok(ChunkOutcome::Aborted { attempts: attempt });
            }

            attempt += 1;
            self.advance(chunk, &mut state, ChunkState::Attempting { attempt });

            let err = match self.attempt(chunk).await {
                Ok(mut stats) => {
                    stats.attempts = attempt;
                    self.advance(chunk, &mut state, ChunkState::Committed);
                    return Ok(ChunkOutcome::Committed(stats));
                }
                Err(err) => err,
            };

            let disposition = classify_attempt_error(&err);
            if disposition == RetryDisposition::Stop || attempt >= self.retry.max_attempts {
                self.advance(chunk, &mut state, ChunkState::FailedTerminal);
                return Err(self.terminal_error(chunk, attempt, disposition, err));
            }

            let delay = self.retry.backoff_delay(attempt);
            self.metrics.increment_retries(1);
            self.advance(chunk, &mut state, ChunkState::Retrying { attempt });
            warn!(
                partition_id = %chunk.partition_id,
                chunk = chunk.index,
                attempt,
                max_attempts = self.retry.max_attempts,
                delay_ms = delay.as_millis(),
                error = %err,
                "Chunk attempt failed, retrying"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.cancelled() => {
                    self.advance(chunk, &mut state, ChunkState::Aborted);
                    return Ok(ChunkOutcome::Aborted { attempts: attempt });
                }
            }
        }
    }

    async fn attempt(&self, chunk: &Chunk) -> Result<ChunkStats, AttemptError> {
        let work = async {
            let transformed = self.transform_all(&chunk.records)?;
            let filtered = (chunk.len() - transformed.len()) as u64;
            let written = self.writer.write(&transformed).await?;
            Ok::<_, AttemptError>(ChunkStats {
                read: chunk.len() as u64,
                written: written.rows_written as u64,
                filtered,
                attempts: 0,
            })
        };

        match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| AttemptError::Timeout(limit))?,
            None => work.await,
        }
    }

    fn transform_all(&self, records: &[Record]) -> Result<Vec<Record>, AttemptError> {
        let mut out = Vec::with_capacity(records.len());
        for record in records {
            if let Some(transformed) = self.transformer.transform(Some(record))? {
                out.push(transformed);
            }
        }
        Ok(out)
    }

    fn terminal_error(
        &self,
        chunk: &Chunk,
        attempts: usize,
        disposition: RetryDisposition,
        source: AttemptError,
    ) -> ChunkError {
        let partition_id = chunk.partition_id.clone();
        let index = chunk.index;

        match (&source, disposition) {
            (AttemptError::Write(WriteError::Rejected { .. }), _) => ChunkError::Rejected {
                partition_id,
                chunk: index,
                source,
            },
            (_, RetryDisposition::Stop) => ChunkError::Permanent {
                partition_id,
                chunk: index,
                attempts,
                source,
            },
            (_, RetryDisposition::Retry) => ChunkError::AttemptsExhausted {
                partition_id,
                chunk: index,
                attempts,
                source,
            },
        }
    }

    fn advance(&self, chunk: &Chunk, state: &mut ChunkState, next: ChunkState) {
        debug_assert!(
            state.can_transition_to(&next),
            "illegal chunk transition {state} -> {next}"
        );
        debug!(
            partition_id = %chunk.partition_id,
            chunk = chunk.index,
            from = %state,
            to = %next,
            "Chunk state changed"
        );
        *state = next;
    }
}
