use crate::{
    error::ReadError,
    source::csv_lines::{KeyedLines, to_record},
};
use model::{partition::descriptor::PartitionDescriptor, records::chunk::Chunk};
use tracing::debug;

/// Reads one partition of the input as a sequence of chunks.
///
/// The reader is lazy: the file is opened on construction but nothing is
/// consumed until the first chunk is requested. Opening a new reader with the
/// same descriptor yields the same records again.
pub struct ChunkReader {
    descriptor: PartitionDescriptor,
    chunk_size: usize,
    lines: KeyedLines,
    /// Absolute offset of the next record to emit.
    position: u64,
    /// Absolute offset the first emitted record must have.
    first_offset: u64,
    skipped: bool,
    next_index: usize,
    exhausted: bool,
}

impl ChunkReader {
    pub fn open(descriptor: &PartitionDescriptor, chunk_size: usize) -> Result<Self, ReadError> {
        Self::resume(descriptor, chunk_size, 0)
    }

    /// Opens a reader positioned `already_read` records into the partition.
    pub fn resume(
        descriptor: &PartitionDescriptor,
        chunk_size: usize,
        already_read: u64,
    ) -> Result<Self, ReadError> {
        let lines = KeyedLines::open(&descriptor.source).map_err(|source| ReadError::Open {
            path: descriptor.source.clone(),
            source,
        })?;
        let chunk_size = chunk_size.max(1);
        let already_read = already_read.min(descriptor.item_count);

        Ok(ChunkReader {
            descriptor: descriptor.clone(),
            chunk_size,
            lines,
            position: 0,
            first_offset: descriptor.start_offset + already_read,
            skipped: false,
            next_index: (already_read / chunk_size as u64) as usize,
            exhausted: false,
        })
    }

    /// Records of this partition emitted so far, including any resumed prefix.
    pub fn records_read(&self) -> u64 {
        self.position
            .max(self.first_offset)
            .saturating_sub(self.descriptor.start_offset)
    }

    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, ReadError> {
        if self.exhausted {
            return Ok(None);
        }
        if !self.skipped {
            self.skip_to_start()?;
        }

        let end = self.descriptor.end_offset();
        let mut chunk = Chunk::new(&self.descriptor.partition_id, self.next_index, self.position);

        while chunk.len() < self.chunk_size && self.position < end {
            match self.lines.next() {
                Some(line) => {
                    let (key, raw) = line?;
                    chunk.records.push(to_record(key, &raw));
                    self.position += 1;
                }
                None => {
                    debug!(
                        partition_id = %self.descriptor.partition_id,
                        position = self.position,
                        "Input exhausted before end of partition"
                    );
                    self.exhausted = true;
                    break;
                }
            }
        }

        if self.position >= end {
            self.exhausted = true;
        }
        if chunk.is_empty() {
            return Ok(None);
        }

        self.next_index += 1;
        Ok(Some(chunk))
    }

    fn skip_to_start(&mut self) -> Result<(), ReadError> {
        while self.position < self.first_offset {
            match self.lines.next() {
                Some(line) => {
                    line?;
                    self.position += 1;
                }
                None => {
                    self.exhausted = true;
                    break;
                }
            }
        }
        self.skipped = true;
        Ok(())
    }
}

impl Iterator for ChunkReader {
    type Item = Result<Chunk, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::records::record::Record;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn input(keys: std::ops::RangeInclusive<i64>) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for key in keys {
            writeln!(file, "{key},\"{{\"\"n\"\":{key}}}\",2024-03-01T10:15:30.123").unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn ids(chunks: &[Chunk]) -> Vec<i64> {
        chunks
            .iter()
            .flat_map(|c| c.records.iter().filter_map(|r| r.id))
            .collect()
    }

    #[test]
    fn reads_partition_range_in_chunks() {
        let file = input(1..=20);
        let descriptor = PartitionDescriptor::new("partition1", 5, 7, file.path());
        let chunks: Vec<Chunk> = ChunkReader::open(&descriptor, 3)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        let sizes: Vec<usize> = chunks.iter().map(Chunk::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(ids(&chunks), (6..=12).collect::<Vec<_>>());
        assert_eq!(chunks[1].index, 1);
        assert_eq!(chunks[1].offset, 8);
        assert!(chunks.iter().all(|c| c.partition_id == "partition1"));
        assert_eq!(chunks[0].records[0].payload.as_deref(), Some("{\"n\":6}"));
    }

    #[test]
    fn rereading_yields_identical_records() {
        let file = input(1..=10);
        let descriptor = PartitionDescriptor::new("partition0", 0, 10, file.path());

        let first: Vec<Record> = ChunkReader::open(&descriptor, 4)
            .unwrap()
            .flat_map(|c| c.unwrap().records)
            .collect();
        let second: Vec<Record> = ChunkReader::open(&descriptor, 4)
            .unwrap()
            .flat_map(|c| c.unwrap().records)
            .collect();

        assert_eq!(first.len(), 10);
        assert_eq!(first, second);
    }

    #[test]
    fn resume_reproduces_the_suffix() {
        let file = input(1..=30);
        let descriptor = PartitionDescriptor::new("partition2", 10, 12, file.path());

        let full: Vec<Record> = ChunkReader::open(&descriptor, 5)
            .unwrap()
            .flat_map(|c| c.unwrap().records)
            .collect();

        for k in 0..=12u64 {
            let mut reader = ChunkReader::resume(&descriptor, 5, k).unwrap();
            let suffix: Vec<Record> = reader.by_ref().flat_map(|c| c.unwrap().records).collect();
            assert_eq!(suffix, full[k as usize..], "resume at {k}");
            assert_eq!(reader.records_read(), 12);
        }

        let mut aligned = ChunkReader::resume(&descriptor, 5, 5).unwrap();
        let chunk = aligned.next_chunk().unwrap().unwrap();
        assert_eq!(chunk.index, 1);
        assert_eq!(chunk.offset, 15);
    }

    #[test]
    fn short_input_ends_early() {
        let file = input(1..=4);
        let descriptor = PartitionDescriptor::new("partition1", 2, 5, file.path());
        let mut reader = ChunkReader::open(&descriptor, 10).unwrap();

        let chunk = reader.next_chunk().unwrap().unwrap();
        assert_eq!(chunk.len(), 2);
        assert!(reader.next_chunk().unwrap().is_none());

        let beyond = PartitionDescriptor::new("partition2", 9, 5, file.path());
        assert!(ChunkReader::open(&beyond, 10).unwrap().next_chunk().unwrap().is_none());
    }

    #[test]
    fn malformed_lines_do_not_shift_offsets() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1,a,2024-03-01T10:15:30").unwrap();
        writeln!(file, "2,b,2024-03-01T10:15:30").unwrap();
        writeln!(file, "bogus,c,2024-03-01T10:15:30").unwrap();
        writeln!(file, "3,d,2024-03-01T10:15:30").unwrap();
        writeln!(file, "4,e,2024-03-01T10:15:30").unwrap();
        file.flush().unwrap();

        let tail = PartitionDescriptor::new("partition1", 2, 2, file.path());
        let chunks: Vec<Chunk> = ChunkReader::open(&tail, 10)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(ids(&chunks), vec![3, 4]);
    }

    #[test]
    fn missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = PartitionDescriptor::new("partition0", 0, 1, dir.path().join("gone.csv"));
        assert!(matches!(
            ChunkReader::open(&descriptor, 1),
            Err(ReadError::Open { .. })
        ));
    }
}
