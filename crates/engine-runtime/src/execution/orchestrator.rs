use crate::{error::JobError, execution::worker::PartitionWorker};
use engine_config::settings::EngineSettings;
use engine_core::{
    metrics::Metrics,
    observer::{JobObserver, ObserverChain},
    sink::RecordSink,
};
use engine_processing::{
    consumer::chunk_writer::ChunkWriter, executor::chunk::ChunkExecutor,
    partition::range::RangePartitioner, transform::Transformer,
};
use futures::stream::{FuturesUnordered, StreamExt};
use model::{
    execution::{
        params::JobParameters,
        result::{JobResult, PartitionResult},
    },
    partition::descriptor::PartitionDescriptor,
};
use std::{sync::Arc, time::Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Runs a job: partitions the input, fans partitions out to at most
/// `grid_size` concurrent workers and folds their results into a
/// [`JobResult`].
pub struct Orchestrator {
    settings: EngineSettings,
    sink: Arc<dyn RecordSink>,
    transformer: Arc<dyn Transformer>,
    observers: Arc<ObserverChain>,
    metrics: Metrics,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        settings: EngineSettings,
        sink: Arc<dyn RecordSink>,
        transformer: Arc<dyn Transformer>,
    ) -> Self {
        Self {
            settings,
            sink,
            transformer,
            observers: Arc::new(ObserverChain::new()),
            metrics: Metrics::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_observers(mut self, observers: ObserverChain) -> Self {
        self.observers = Arc::new(observers);
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Shares an externally owned abort signal, e.g. one wired to SIGINT.
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that aborts the job when cancelled. In-flight chunk attempts
    /// finish; nothing new starts.
    pub fn abort_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Computes the partition plan without running anything.
    pub async fn plan(&self, params: &JobParameters) -> Result<Vec<PartitionDescriptor>, JobError> {
        self.settings.validate()?;

        let partitioner = RangePartitioner::new(params.input_file.clone());
        let grid_size = self.settings.grid_size;
        let partitions =
            tokio::task::spawn_blocking(move || partitioner.partition(grid_size)).await??;
        Ok(partitions)
    }

    pub async fn run(&self, params: JobParameters) -> Result<JobResult, JobError> {
        let started = Instant::now();
        let partitions = self.plan(&params).await?;

        let mut result = JobResult::new(params.clone());
        let job_id = result.job_id.clone();
        debug!(job_id = %job_id, partitions = partitions.len(), "Spawning partition workers");
        self.observers.on_job_start(&job_id, &params, &partitions);

        let executor = ChunkExecutor::new(
            self.transformer.clone(),
            ChunkWriter::new(self.sink.clone(), self.metrics.clone()),
            self.settings.retry_policy(),
            self.metrics.clone(),
            self.cancel.clone(),
        )
        .with_attempt_timeout(self.settings.per_chunk_timeout);
        let worker = Arc::new(PartitionWorker::new(executor, self.settings.chunk_size));

        let semaphore = Arc::new(Semaphore::new(self.settings.grid_size));
        let mut running = FuturesUnordered::new();

        for descriptor in partitions {
            let partition_id = descriptor.partition_id.clone();
            let semaphore = semaphore.clone();
            let worker = worker.clone();
            let observers = self.observers.clone();
            let job_id = job_id.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        let mut result = PartitionResult::new(&descriptor.partition_id);
                        result.fail("worker pool closed");
                        return result;
                    }
                };
                observers.on_partition_start(&job_id, &descriptor);
                worker.run(&descriptor).await
            });
            running.push(async move { (partition_id, handle.await) });
        }

        while let Some((partition_id, joined)) = running.next().await {
            let partition = match joined {
                Ok(partition) => partition,
                Err(e) => {
                    error!(partition_id = %partition_id, error = %e, "Partition worker crashed");
                    let mut crashed = PartitionResult::new(&partition_id);
                    crashed.failure_count = 1;
                    crashed.fail(if e.is_panic() {
                        "worker panicked".to_string()
                    } else {
                        format!("worker cancelled: {e}")
                    });
                    crashed
                }
            };
            self.observers.on_partition_end(&job_id, &partition);
            result.record_partition(partition);
        }

        let aborted = self.cancel.is_cancelled();
        if aborted {
            warn!(job_id = %job_id, "Job was aborted");
        }

        let result = result.finish(aborted, started.elapsed());
        self.observers.on_job_end(&result);
        Ok(result)
    }
}
