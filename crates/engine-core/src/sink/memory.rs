use crate::{error::SinkError, sink::RecordSink};
use async_trait::async_trait;
use model::records::processed::ProcessedRow;
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering},
};
use tokio::sync::RwLock;

/// In-process record store.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    rows: RwLock<BTreeMap<i64, ProcessedRow>>,
    upserts: AtomicU64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total rows received by `upsert_batch`, counting overwrites.
    pub fn upsert_count(&self) -> u64 {
        self.upserts.load(Ordering::Relaxed)
    }

    pub async fn snapshot(&self) -> Vec<ProcessedRow> {
        self.rows.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl RecordSink for MemoryRecordStore {
    async fn upsert_batch(&self, rows: &[ProcessedRow]) -> Result<(), SinkError> {
        let mut table = self.rows.write().await;
        for row in rows {
            table.insert(row.id, row.clone());
        }
        self.upserts.fetch_add(rows.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Option<ProcessedRow>, SinkError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn count(&self) -> Result<u64, SinkError> {
        Ok(self.rows.read().await.len() as u64)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
