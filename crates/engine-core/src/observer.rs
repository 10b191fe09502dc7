use crate::metrics::Metrics;
use model::{
    execution::{
        params::JobParameters,
        result::{JobResult, PartitionResult},
    },
    partition::descriptor::PartitionDescriptor,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Lifecycle hooks invoked synchronously by the orchestrator.
///
/// All methods default to no-ops so observers implement only what they need.
pub trait JobObserver: Send + Sync {
    fn on_job_start(
        &self,
        _job_id: &str,
        _params: &JobParameters,
        _partitions: &[PartitionDescriptor],
    ) {
    }

    fn on_job_end(&self, _result: &JobResult) {}

    fn on_partition_start(&self, _job_id: &str, _partition: &PartitionDescriptor) {}

    fn on_partition_end(&self, _job_id: &str, _result: &PartitionResult) {}
}

/// Ordered list of observers; each event is delivered in registration order.
#[derive(Clone, Default)]
pub struct ObserverChain {
    observers: Vec<Arc<dyn JobObserver>>,
}

impl ObserverChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn JobObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl JobObserver for ObserverChain {
    fn on_job_start(
        &self,
        job_id: &str,
        params: &JobParameters,
        partitions: &[PartitionDescriptor],
    ) {
        for observer in &self.observers {
            observer.on_job_start(job_id, params, partitions);
        }
    }

    fn on_job_end(&self, result: &JobResult) {
        for observer in &self.observers {
            observer.on_job_end(result);
        }
    }

    fn on_partition_start(&self, job_id: &str, partition: &PartitionDescriptor) {
        for observer in &self.observers {
            observer.on_partition_start(job_id, partition);
        }
    }

    fn on_partition_end(&self, job_id: &str, result: &PartitionResult) {
        for observer in &self.observers {
            observer.on_partition_end(job_id, result);
        }
    }
}

/// Emits the structured job and partition log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl JobObserver for LoggingObserver {
    fn on_job_start(
        &self,
        job_id: &str,
        params: &JobParameters,
        partitions: &[PartitionDescriptor],
    ) {
        info!(
            job_id = %job_id,
            input_file = %params.input_file.display(),
            timestamp = params.timestamp,
            partitions = partitions.len(),
            "Starting job"
        );
    }

    fn on_job_end(&self, result: &JobResult) {
        if result.status.is_success() {
            info!(
                job_id = %result.job_id,
                status = %result.status,
                duration_ms = result.duration.as_millis(),
                read = result.read_count(),
                written = result.write_count(),
                failures = result.failure_count(),
                "Job finished"
            );
        } else {
            error!(
                job_id = %result.job_id,
                status = %result.status,
                aborted = result.aborted,
                duration_ms = result.duration.as_millis(),
                read = result.read_count(),
                written = result.write_count(),
                failures = result.failure_count(),
                failed_partitions = result.failed_partitions().count(),
                "Job finished"
            );
        }
    }

    fn on_partition_start(&self, job_id: &str, partition: &PartitionDescriptor) {
        info!(
            job_id = %job_id,
            partition_id = %partition.partition_id,
            start_at = partition.start_offset,
            item_count = partition.item_count,
            "Starting partition"
        );
    }

    fn on_partition_end(&self, job_id: &str, result: &PartitionResult) {
        if result.is_completed() {
            info!(
                job_id = %job_id,
                partition_id = %result.partition_id,
                read_count = result.read_count,
                write_count = result.write_count,
                failure_count = result.failure_count,
                status = %result.status,
                "Completed partition"
            );
        } else {
            warn!(
                job_id = %job_id,
                partition_id = %result.partition_id,
                read_count = result.read_count,
                write_count = result.write_count,
                failure_count = result.failure_count,
                status = %result.status,
                error = result.error.as_deref().unwrap_or("unknown"),
                "Partition failed"
            );
        }
    }
}

/// Feeds the job and step timers.
#[derive(Debug, Clone)]
pub struct MetricsObserver {
    metrics: Metrics,
}

impl MetricsObserver {
    pub fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }
}

impl JobObserver for MetricsObserver {
    fn on_job_end(&self, result: &JobResult) {
        self.metrics.record_job_duration(result.duration);
    }

    fn on_partition_end(&self, _job_id: &str, result: &PartitionResult) {
        self.metrics.record_step_duration(result.duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Mutex, time::Duration};

    #[derive(Default)]
    struct Recorder {
        name: &'static str,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl JobObserver for Recorder {
        fn on_partition_end(&self, _job_id: &str, result: &PartitionResult) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, result.partition_id));
        }
    }

    #[test]
    fn chain_notifies_in_registration_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let chain = ObserverChain::new()
            .with(Arc::new(Recorder {
                name: "first",
                events: events.clone(),
            }))
            .with(Arc::new(Recorder {
                name: "second",
                events: events.clone(),
            }));

        chain.on_partition_end("job", &PartitionResult::new("partition0"));

        assert_eq!(
            *events.lock().unwrap(),
            vec!["first:partition0", "second:partition0"]
        );
    }

    #[test]
    fn metrics_observer_records_timers() {
        let metrics = Metrics::new();
        let observer = MetricsObserver::new(metrics.clone());

        let mut partition = PartitionResult::new("partition0");
        partition.duration = Duration::from_millis(25);
        observer.on_partition_end("job", &partition);

        let mut job = JobResult::new(JobParameters::new("in.csv"));
        job.record_partition(partition);
        observer.on_job_end(&job.finish(false, Duration::from_millis(40)));

        let snap = metrics.snapshot();
        assert_eq!(snap.step_duration.total, Duration::from_millis(25));
        assert_eq!(snap.job_duration.max, Duration::from_millis(40));
    }
}
