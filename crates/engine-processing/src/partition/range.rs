use crate::{
    error::PartitionError,
    source::csv_lines::{KeyedLines, MIN_KEY},
};
use model::partition::descriptor::PartitionDescriptor;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Summary of one pass over the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyScan {
    pub max_key: i64,
    pub valid_lines: u64,
    pub malformed_lines: u64,
}

/// Splits an input file into contiguous key ranges.
///
/// Keys are assumed dense from `MIN_KEY` to the largest key seen, so a range
/// of keys maps directly onto a range of record offsets.
#[derive(Debug, Clone)]
pub struct RangePartitioner {
    source: PathBuf,
}

impl RangePartitioner {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        RangePartitioner {
            source: source.into(),
        }
    }

    /// Scans the input once, tracking the largest key.
    pub fn scan(&self) -> Result<KeyScan, PartitionError> {
        let read_err = |source| PartitionError::Read {
            path: self.source.clone(),
            source,
        };

        let mut lines = KeyedLines::open(&self.source).map_err(read_err)?;
        let mut max_key = None;
        let mut valid_lines = 0u64;

        for line in lines.by_ref() {
            let (key, _) = line.map_err(read_err)?;
            valid_lines += 1;
            max_key = Some(max_key.map_or(key, |max: i64| max.max(key)));
        }

        let max_key = max_key.ok_or_else(|| PartitionError::EmptyOrInvalidInput {
            path: self.source.clone(),
        })?;

        Ok(KeyScan {
            max_key,
            valid_lines,
            malformed_lines: lines.malformed(),
        })
    }

    pub fn partition(&self, grid_size: usize) -> Result<Vec<PartitionDescriptor>, PartitionError> {
        if grid_size == 0 {
            return Err(PartitionError::InvalidGridSize);
        }

        let scan = self.scan()?;
        let total = (scan.max_key - MIN_KEY + 1) as u64;
        if scan.valid_lines != total {
            warn!(
                source = %self.source.display(),
                valid_lines = scan.valid_lines,
                key_span = total,
                "Input keys are not dense; partition offsets assume they are"
            );
        }

        let partitions = plan_ranges(scan.max_key, grid_size, &self.source)?;
        info!(
            source = %self.source.display(),
            grid_size,
            partitions = partitions.len(),
            max_key = scan.max_key,
            malformed_lines = scan.malformed_lines,
            "Input partitioned"
        );
        Ok(partitions)
    }
}

/// Splits keys `MIN_KEY..=max_key` into ranges of `ceil(total / grid_size)`
/// keys each, the last one clamped to `max_key`.
///
/// When that width would leave fewer than `grid_size` ranges even though there
/// are at least `grid_size` keys, the keys are spread evenly instead so every
/// worker gets a range.
pub fn plan_ranges(
    max_key: i64,
    grid_size: usize,
    source: &Path,
) -> Result<Vec<PartitionDescriptor>, PartitionError> {
    if grid_size == 0 {
        return Err(PartitionError::InvalidGridSize);
    }
    if max_key < MIN_KEY {
        return Err(PartitionError::EmptyOrInvalidInput {
            path: source.to_path_buf(),
        });
    }

    let total = (max_key - MIN_KEY) as u64 + 1;
    let grid = grid_size as u64;

    let mut partitions = Vec::with_capacity(grid.min(total) as usize);
    let mut start = MIN_KEY;
    for item_count in range_sizes(total, grid) {
        let end = start + (item_count - 1) as i64;
        let descriptor = PartitionDescriptor::new(
            format!("partition{}", partitions.len()),
            (start - MIN_KEY) as u64,
            item_count,
            source,
        );

        info!(
            partition_id = %descriptor.partition_id,
            start_id = start,
            end_id = end,
            start_at = descriptor.start_offset,
            item_count,
            "Partition created"
        );

        partitions.push(descriptor);
        start = end.saturating_add(1);
    }

    Ok(partitions)
}

fn range_sizes(total: u64, grid: u64) -> Vec<u64> {
    let target = total.div_ceil(grid);
    let count = total.div_ceil(target);

    if count < grid && total >= grid {
        let (base, extra) = (total / grid, total % grid);
        return (0..grid).map(|i| base + u64::from(i < extra)).collect();
    }

    (0..count).map(|i| target.min(total - i * target)).collect()
}
