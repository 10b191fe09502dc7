use crate::error::SinkError;
use async_trait::async_trait;
use model::records::processed::ProcessedRow;

pub mod memory;
pub mod postgres;
pub mod sled_store;

/// A record store keyed by `id`.
///
/// `upsert_batch` is the unit of atomicity: either every row of the call is
/// visible afterwards or none is. Re-upserting an existing `id` replaces its
/// payload, timestamp and status.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn upsert_batch(&self, rows: &[ProcessedRow]) -> Result<(), SinkError>;

    async fn get(&self, id: i64) -> Result<Option<ProcessedRow>, SinkError>;

    async fn count(&self) -> Result<u64, SinkError>;

    fn name(&self) -> &'static str;
}
