use crate::{error::SinkError, sink::RecordSink};
use async_trait::async_trait;
use model::records::processed::ProcessedRow;
use sled::transaction::{ConflictableTransactionResult, TransactionError};
use std::path::Path;

const TREE_NAME: &str = "processed_record";

/// Embedded durable store. Each `upsert_batch` runs as one sled transaction
/// and is flushed before returning.
pub struct SledRecordStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledRecordStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let db = sled::open(path)?;
        let tree = db.open_tree(TREE_NAME)?;
        Ok(Self { db, tree })
    }

    /// Big-endian so that the tree iterates in id order for non-negative ids.
    #[inline]
    fn key(id: i64) -> [u8; 8] {
        id.to_be_bytes()
    }
}

#[async_trait]
impl RecordSink for SledRecordStore {
    async fn upsert_batch(&self, rows: &[ProcessedRow]) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }

        let encoded = rows
            .iter()
            .map(|row| Ok((Self::key(row.id), bincode::serialize(row)?)))
            .collect::<Result<Vec<_>, SinkError>>()?;

        let result = self
            .tree
            .transaction(|tx| -> ConflictableTransactionResult<(), ()> {
                for (key, value) in &encoded {
                    tx.insert(key.as_slice(), value.as_slice())?;
                }
                Ok(())
            });

        match result {
            Ok(()) => {}
            Err(TransactionError::Abort(())) => {
                return Err(SinkError::Other("sled transaction aborted".into()));
            }
            Err(TransactionError::Storage(e)) => return Err(SinkError::Sled(e)),
        }

        self.db.flush_async().await?;
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Option<ProcessedRow>, SinkError> {
        match self.tree.get(Self::key(id))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn count(&self) -> Result<u64, SinkError> {
        Ok(self.tree.len() as u64)
    }

    fn name(&self) -> &'static str {
        "sled"
    }
}
