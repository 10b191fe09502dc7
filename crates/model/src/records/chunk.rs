use crate::records::record::Record;

/// Contiguous slice of records read from one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub partition_id: String,
    /// Zero-based position of this chunk within its partition.
    pub index: usize,
    /// Record offset (relative to the start of the input) of the first record.
    pub offset: u64,
    pub records: Vec<Record>,
}

impl Chunk {
    pub fn new(partition_id: impl Into<String>, index: usize, offset: u64) -> Self {
        Chunk {
            partition_id: partition_id.into(),
            index,
            offset,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Offset one past the last record of this chunk.
    pub fn end_offset(&self) -> u64 {
        self.offset + self.records.len() as u64
    }
}
