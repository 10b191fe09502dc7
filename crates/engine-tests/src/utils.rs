#![allow(dead_code)]

use async_trait::async_trait;
use engine_config::settings::EngineSettings;
use engine_core::{
    error::SinkError,
    metrics::Metrics,
    observer::{LoggingObserver, MetricsObserver, ObserverChain},
    sink::{RecordSink, memory::MemoryRecordStore},
};
use engine_processing::{error::TransformError, transform::Transformer};
use engine_runtime::execution::orchestrator::Orchestrator;
use model::records::{processed::ProcessedRow, record::Record};
use std::{
    io::{self, Write},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tempfile::NamedTempFile;

pub fn input_line(id: i64) -> String {
    format!("{id},\"{{\"\"seq\"\":{id},\"\"note\"\":\"\"row, {id}\"\"}}\",2024-03-01T10:15:30.123")
}

/// Writes the given lines to a temp file, one per line.
pub fn write_input(lines: impl IntoIterator<Item = String>) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create input");
    for line in lines {
        writeln!(file, "{line}").expect("write input");
    }
    file.flush().expect("flush input");
    file
}

pub fn sequential_input(ids: std::ops::RangeInclusive<i64>) -> NamedTempFile {
    write_input(ids.map(input_line))
}

pub fn test_settings(grid_size: usize, chunk_size: usize) -> EngineSettings {
    let mut settings = EngineSettings::default();
    settings.grid_size = grid_size;
    settings.chunk_size = chunk_size;
    settings.retry.base_delay = Duration::from_millis(1);
    settings.retry.max_delay = Duration::from_millis(5);
    settings
}

/// Orchestrator wired the way the binary wires it.
pub fn orchestrator(
    settings: EngineSettings,
    sink: Arc<dyn RecordSink>,
    transformer: Arc<dyn Transformer>,
    metrics: &Metrics,
) -> Orchestrator {
    let observers = ObserverChain::new()
        .with(Arc::new(LoggingObserver))
        .with(Arc::new(MetricsObserver::new(metrics.clone())));

    Orchestrator::new(settings, sink, transformer)
        .with_metrics(metrics.clone())
        .with_observers(observers)
}

/// Clears the id of one record after running the wrapped transformer.
pub struct DropId<T> {
    pub inner: T,
    pub id: i64,
}

impl<T: Transformer> Transformer for DropId<T> {
    fn transform(&self, record: Option<&Record>) -> Result<Option<Record>, TransformError> {
        let out = self.inner.transform(record)?;
        Ok(out.map(|mut r| {
            if r.id == Some(self.id) {
                r.id = None;
            }
            r
        }))
    }
}

/// Memory store whose first `failures` upserts fail with a transient error.
pub struct FlakySink {
    pub inner: MemoryRecordStore,
    failures: usize,
    calls: AtomicUsize,
}

impl FlakySink {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: MemoryRecordStore::new(),
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSink for FlakySink {
    async fn upsert_batch(&self, rows: &[ProcessedRow]) -> Result<(), SinkError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(SinkError::Io(io::Error::other("connection reset by peer")));
        }
        self.inner.upsert_batch(rows).await
    }

    async fn get(&self, id: i64) -> Result<Option<ProcessedRow>, SinkError> {
        self.inner.get(id).await
    }

    async fn count(&self) -> Result<u64, SinkError> {
        self.inner.count().await
    }

    fn name(&self) -> &'static str {
        "flaky-memory"
    }
}
