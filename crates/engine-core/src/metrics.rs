use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

#[derive(Debug, Default)]
struct Timer {
    count: AtomicU64,
    total_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl Timer {
    fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
    }

    fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            count: self.count.load(Ordering::Relaxed),
            total: Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed)),
            max: Duration::from_nanos(self.max_nanos.load(Ordering::Relaxed)),
        }
    }
}

#[derive(Debug, Default)]
struct InnerMetrics {
    records_processed: AtomicU64,
    chunks_committed: AtomicU64,
    failure_count: AtomicU64,
    retry_count: AtomicU64,
    job_duration: Timer,
    step_duration: Timer,
}

/// Process-wide counters and timers. Cloning shares the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub count: u64,
    pub total: Duration,
    pub max: Duration,
}

impl TimerSnapshot {
    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos((self.total.as_nanos() / u128::from(self.count)) as u64)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_processed: u64,
    pub chunks_committed: u64,
    pub failure_count: u64,
    pub retry_count: u64,
    pub job_duration: TimerSnapshot,
    pub step_duration: TimerSnapshot,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_records(&self, count: u64) {
        self.inner
            .records_processed
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_chunks(&self, count: u64) {
        self.inner
            .chunks_committed
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_failures(&self, count: u64) {
        self.inner.failure_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_retries(&self, count: u64) {
        self.inner.retry_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_job_duration(&self, elapsed: Duration) {
        self.inner.job_duration.record(elapsed);
    }

    pub fn record_step_duration(&self, elapsed: Duration) {
        self.inner.step_duration.record(elapsed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_processed: self.inner.records_processed.load(Ordering::Relaxed),
            chunks_committed: self.inner.chunks_committed.load(Ordering::Relaxed),
            failure_count: self.inner.failure_count.load(Ordering::Relaxed),
            retry_count: self.inner.retry_count.load(Ordering::Relaxed),
            job_duration: self.inner.job_duration.snapshot(),
            step_duration: self.inner.step_duration.snapshot(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let metrics = Metrics::new();
        let other = metrics.clone();
        metrics.increment_records(10);
        other.increment_records(5);
        other.increment_failures(1);

        let snap = metrics.snapshot();
        assert_eq!(snap.records_processed, 15);
        assert_eq!(snap.failure_count, 1);
    }

    #[test]
    fn timers_track_count_total_and_max() {
        let metrics = Metrics::new();
        metrics.record_step_duration(Duration::from_millis(10));
        metrics.record_step_duration(Duration::from_millis(30));

        let step = metrics.snapshot().step_duration;
        assert_eq!(step.count, 2);
        assert_eq!(step.total, Duration::from_millis(40));
        assert_eq!(step.max, Duration::from_millis(30));
        assert_eq!(step.mean(), Duration::from_millis(20));
        assert_eq!(metrics.snapshot().job_duration.count, 0);
    }
}
