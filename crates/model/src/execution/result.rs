use crate::execution::{
    params::JobParameters,
    status::{JobStatus, PartitionStatus},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of one partition, handed back by value from its worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionResult {
    pub partition_id: String,
    pub read_count: u64,
    pub write_count: u64,
    /// Records the transformer mapped to nothing.
    pub filter_count: u64,
    /// Chunks that ended in a terminal failure (0 or 1, partitions fail fast).
    pub failure_count: u64,
    /// Failed attempts that were followed by another attempt.
    pub retry_count: u64,
    pub chunks_committed: u64,
    pub status: PartitionStatus,
    pub error: Option<String>,
    pub duration: Duration,
}

impl PartitionResult {
    pub fn new(partition_id: impl Into<String>) -> Self {
        PartitionResult {
            partition_id: partition_id.into(),
            read_count: 0,
            write_count: 0,
            filter_count: 0,
            failure_count: 0,
            retry_count: 0,
            chunks_committed: 0,
            status: PartitionStatus::Completed,
            error: None,
            duration: Duration::ZERO,
        }
    }

    /// Marks the partition failed, keeping the counters gathered so far.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = PartitionStatus::Failed;
        self.error = Some(error.into());
    }

    pub fn is_completed(&self) -> bool {
        self.status == PartitionStatus::Completed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    pub parameters: JobParameters,
    pub status: JobStatus,
    pub aborted: bool,
    pub partitions: Vec<PartitionResult>,
    pub duration: Duration,
}

impl JobResult {
    pub fn new(parameters: JobParameters) -> Self {
        JobResult {
            job_id: uuid::Uuid::new_v4().to_string(),
            parameters,
            status: JobStatus::Failed,
            aborted: false,
            partitions: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn record_partition(&mut self, result: PartitionResult) {
        self.partitions.push(result);
    }

    /// Freezes the result: sorts partitions by id and derives the job status.
    ///
    /// A job completes only when it was not aborted, ran at least one
    /// partition, and every partition completed.
    pub fn finish(mut self, aborted: bool, duration: Duration) -> Self {
        self.partitions
            .sort_by(|a, b| natural_key(&a.partition_id).cmp(&natural_key(&b.partition_id)));
        self.aborted = aborted;
        self.duration = duration;
        self.status = if !aborted
            && !self.partitions.is_empty()
            && self.partitions.iter().all(PartitionResult::is_completed)
        {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };
        self
    }

    pub fn read_count(&self) -> u64 {
        self.partitions.iter().map(|p| p.read_count).sum()
    }

    pub fn write_count(&self) -> u64 {
        self.partitions.iter().map(|p| p.write_count).sum()
    }

    pub fn failure_count(&self) -> u64 {
        self.partitions.iter().map(|p| p.failure_count).sum()
    }

    pub fn failed_partitions(&self) -> impl Iterator<Item = &PartitionResult> {
        self.partitions.iter().filter(|p| !p.is_completed())
    }

    pub fn partition(&self, partition_id: &str) -> Option<&PartitionResult> {
        self.partitions
            .iter()
            .find(|p| p.partition_id == partition_id)
    }
}

// "partition10" sorts after "partition9".
fn natural_key(id: &str) -> (String, u64) {
    let digits = id.len() - id.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (prefix, suffix) = id.split_at(id.len() - digits);
    (prefix.to_string(), suffix.parse().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(id: &str, written: u64) -> PartitionResult {
        PartitionResult {
            read_count: written,
            write_count: written,
            ..PartitionResult::new(id)
        }
    }

    #[test]
    fn completes_when_every_partition_completes() {
        let mut job = JobResult::new(JobParameters::new("in.csv"));
        job.record_partition(completed("partition1", 5));
        job.record_partition(completed("partition0", 5));

        let job = job.finish(false, Duration::from_millis(10));
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.write_count(), 10);
        assert_eq!(job.partitions[0].partition_id, "partition0");
    }

    #[test]
    fn single_failed_partition_fails_the_job() {
        let mut job = JobResult::new(JobParameters::new("in.csv"));
        job.record_partition(completed("partition0", 5));
        let mut failed = completed("partition1", 0);
        failed.fail("writer rejected chunk");
        job.record_partition(failed);

        let job = job.finish(false, Duration::ZERO);
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failed_partitions().count(), 1);
        assert_eq!(
            job.partition("partition1").and_then(|p| p.error.as_deref()),
            Some("writer rejected chunk")
        );
    }

    #[test]
    fn aborted_or_empty_job_fails() {
        let mut job = JobResult::new(JobParameters::new("in.csv"));
        job.record_partition(completed("partition0", 5));
        assert_eq!(job.finish(true, Duration::ZERO).status, JobStatus::Failed);

        let empty = JobResult::new(JobParameters::new("in.csv"));
        assert_eq!(empty.finish(false, Duration::ZERO).status, JobStatus::Failed);
    }

    #[test]
    fn partitions_sort_numerically() {
        let mut job = JobResult::new(JobParameters::new("in.csv"));
        for id in ["partition10", "partition2", "partition0"] {
            job.record_partition(completed(id, 1));
        }
        let job = job.finish(false, Duration::ZERO);
        let ids: Vec<_> = job.partitions.iter().map(|p| p.partition_id.as_str()).collect();
        assert_eq!(ids, ["partition0", "partition2", "partition10"]);
    }
}
