use engine_processing::{
    executor::chunk::{ChunkExecutor, ChunkOutcome},
    producer::chunk_reader::ChunkReader,
};
use model::{execution::result::PartitionResult, partition::descriptor::PartitionDescriptor};
use std::time::Instant;
use tracing::{error, info, warn};

/// Drives one partition's chunk loop: read, then transform and write under
/// the executor, until the range is exhausted or a chunk fails for good.
pub struct PartitionWorker {
    executor: ChunkExecutor,
    chunk_size: usize,
}

impl PartitionWorker {
    pub fn new(executor: ChunkExecutor, chunk_size: usize) -> Self {
        Self {
            executor,
            chunk_size,
        }
    }

    pub async fn run(&self, descriptor: &PartitionDescriptor) -> PartitionResult {
        let started = Instant::now();
        let mut result = PartitionResult::new(&descriptor.partition_id);

        let mut reader = match ChunkReader::open(descriptor, self.chunk_size) {
            Ok(reader) => reader,
            Err(e) => {
                error!(partition_id = %descriptor.partition_id, error = %e, "Failed to open reader");
                result.failure_count += 1;
                result.fail(e.to_string());
                result.duration = started.elapsed();
                return result;
            }
        };

        loop {
            if self.executor.cancel_token().is_cancelled() {
                warn!(
                    partition_id = %descriptor.partition_id,
                    chunks_committed = result.chunks_committed,
                    "Job aborted, stopping partition"
                );
                result.fail("job aborted");
                break;
            }

            let chunk = match reader.next_chunk() {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    error!(partition_id = %descriptor.partition_id, error = %e, "Failed to read chunk");
                    result.failure_count += 1;
                    result.fail(e.to_string());
                    break;
                }
            };

            match self.executor.execute(&chunk).await {
                Ok(ChunkOutcome::Committed(stats)) => {
                    result.read_count += stats.read;
                    result.write_count += stats.written;
                    result.filter_count += stats.filtered;
                    result.retry_count += stats.attempts.saturating_sub(1) as u64;
                    result.chunks_committed += 1;
                }
                Ok(ChunkOutcome::Aborted { attempts }) => {
                    warn!(
                        partition_id = %descriptor.partition_id,
                        chunk = chunk.index,
                        attempts,
                        "Job aborted before chunk committed"
                    );
                    result.read_count += chunk.len() as u64;
                    result.retry_count += attempts.saturating_sub(1) as u64;
                    result.fail(format!("job aborted at chunk {}", chunk.index));
                    break;
                }
                Err(e) => {
                    error!(
                        partition_id = %descriptor.partition_id,
                        chunk = chunk.index,
                        offset = chunk.offset,
                        error = %e,
                        "Chunk failed, stopping partition"
                    );
                    result.read_count += chunk.len() as u64;
                    result.retry_count += e.attempts().saturating_sub(1) as u64;
                    result.failure_count += 1;
                    result.fail(e.to_string());
                    break;
                }
            }
        }

        result.duration = started.elapsed();
        info!(
            partition_id = %result.partition_id,
            status = %result.status,
            read_count = result.read_count,
            write_count = result.write_count,
            duration_ms = result.duration.as_millis(),
            "Partition worker finished"
        );
        result
    }
}
