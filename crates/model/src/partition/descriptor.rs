use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One contiguous key range of the input, handed from the partitioner to a
/// chunk reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    pub partition_id: String,
    /// Number of records to skip from the start of the input.
    pub start_offset: u64,
    /// Number of records belonging to this partition. Always > 0.
    pub item_count: u64,
    pub source: PathBuf,
}

impl PartitionDescriptor {
    pub fn new(
        partition_id: impl Into<String>,
        start_offset: u64,
        item_count: u64,
        source: impl Into<PathBuf>,
    ) -> Self {
        PartitionDescriptor {
            partition_id: partition_id.into(),
            start_offset,
            item_count,
            source: source.into(),
        }
    }

    /// Offset one past the last record of this partition.
    pub fn end_offset(&self) -> u64 {
        self.start_offset + self.item_count
    }
}

/// Checks that `parts` tile `[0, total)` in order with no gap or overlap.
pub fn is_contiguous_cover(parts: &[PartitionDescriptor], total: u64) -> bool {
    let mut next = 0;
    for part in parts {
        if part.item_count == 0 || part.start_offset != next {
            return false;
        }
        next = part.end_offset();
    }
    next == total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(start: u64, count: u64) -> PartitionDescriptor {
        PartitionDescriptor::new(format!("p{start}"), start, count, "in.csv")
    }

    #[test]
    fn detects_contiguous_cover() {
        assert!(is_contiguous_cover(&[part(0, 5), part(5, 5)], 10));
    }

    #[test]
    fn detects_gaps_and_overlaps() {
        assert!(!is_contiguous_cover(&[part(0, 5), part(6, 4)], 10));
        assert!(!is_contiguous_cover(&[part(0, 5), part(4, 6)], 10));
        assert!(!is_contiguous_cover(&[part(0, 5)], 10));
        assert!(!is_contiguous_cover(&[part(0, 0), part(0, 10)], 10));
    }
}
