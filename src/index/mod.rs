//! BAM index (BAI): build, persist and query.
//!
//! An index maps a reference sequence and a 0-based half-open interval to the
//! virtual-offset chunks of a BGZF-compressed alignment file that may hold
//! overlapping records.
//!
//! # Structure
//!
//! - [`binning`] - the hierarchical bin scheme (`bin_for`, `candidate_bins`)
//! - [`VirtualOffset`] and [`Chunk`] - addressing inside the compressed stream
//! - [`ReferenceIndex`] - bins and linear index of one reference
//! - [`IndexBuilder`] - single pass over coordinate-sorted records
//! - [`BamIndex`] - the aggregate, read-only once built
//!
//! # Example
//!
//! ```
//! use baindex::index::{BamIndex, Chunk, VirtualOffset};
//! use baindex::source::AlignmentRecord;
//!
//! let span = Chunk::new(VirtualOffset::new(100, 0), VirtualOffset::new(150, 0)).unwrap();
//! let records = vec![AlignmentRecord::mapped(0, 1000, 1050, span)];
//!
//! let index = BamIndex::build(1, &records).unwrap();
//! let chunks = index.query(0, 900, 1100).unwrap();
//! assert_eq!(chunks, vec![span]);
//! ```

pub mod binning;
mod builder;
mod chunk;
mod codec;
mod query;
mod reference;
mod virtual_offset;

pub use builder::{IndexBuilder, build_partitioned};
pub use chunk::{Chunk, merge_chunks};
pub use codec::MAGIC;
pub use query::query_regions;
pub use reference::{Bin, ReferenceIndex, ReferenceMetadata};
pub use virtual_offset::{MAX_BLOCK_OFFSET, VirtualOffset};

use crate::Result;
use crate::source::{AlignmentRecord, AlignmentSource};
use bytes::Bytes;
use std::io::{Read, Write};

/// Index of a coordinate-sorted alignment file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BamIndex {
    references: Vec<ReferenceIndex>,
    unplaced_unmapped_record_count: Option<u64>,
}

impl BamIndex {
    pub(crate) fn from_parts(
        references: Vec<ReferenceIndex>,
        unplaced_unmapped_record_count: Option<u64>,
    ) -> Self {
        Self {
            references,
            unplaced_unmapped_record_count,
        }
    }

    /// Builds an index over `records`, which must be coordinate-sorted.
    pub fn build<'a, I>(reference_count: usize, records: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a AlignmentRecord>,
    {
        IndexBuilder::build(reference_count, records)
    }

    /// Builds an index by draining a record source.
    pub fn from_source<S: AlignmentSource>(mut source: S) -> Result<Self> {
        let mut builder = IndexBuilder::new(source.reference_count());
        for record in &mut source {
            builder.push(&record?)?;
        }
        builder.finish()
    }

    /// Chunks that must be scanned to find every record overlapping `[start, end)`.
    pub fn query(&self, reference_id: usize, start: i64, end: i64) -> Result<Vec<Chunk>> {
        query::query(self, reference_id, start, end)
    }

    pub fn serialize(&self) -> Bytes {
        codec::encode(self)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        codec::decode(data)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.serialize())?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::deserialize(&data)
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    pub fn reference(&self, reference_id: usize) -> Option<&ReferenceIndex> {
        self.references.get(reference_id)
    }

    pub fn references(&self) -> &[ReferenceIndex] {
        &self.references
    }

    pub(crate) fn into_references(self) -> Vec<ReferenceIndex> {
        self.references
    }

    /// Records without a reference coordinate, if the index carries the count.
    pub fn unplaced_unmapped_record_count(&self) -> Option<u64> {
        self.unplaced_unmapped_record_count
    }

    /// A chunk covering every indexed record of every reference.
    ///
    /// Returned for references without index data so that a query never misses
    /// records.
    pub fn full_scan_chunk(&self) -> Chunk {
        let begin = self
            .references
            .iter()
            .filter_map(ReferenceIndex::min_offset)
            .min();
        let end = self
            .references
            .iter()
            .filter_map(ReferenceIndex::max_offset)
            .max();

        match (begin, end) {
            (Some(begin), Some(end)) => Chunk::new(begin, end).unwrap_or(Chunk::FULL),
            _ => Chunk::FULL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RecordList;

    fn record(reference_id: usize, start: i64, end: i64, begin: u64, finish: u64) -> AlignmentRecord {
        AlignmentRecord::mapped(
            reference_id,
            start,
            end,
            Chunk::new(VirtualOffset::new(begin, 0), VirtualOffset::new(finish, 0)).unwrap(),
        )
    }

    #[test]
    fn test_full_scan_chunk_spans_all_references() {
        let records = vec![
            record(0, 1000, 1050, 100, 150),
            record(2, 10, 60, 400, 480),
        ];
        let index = BamIndex::build(3, &records).unwrap();
        let chunk = index.full_scan_chunk();
        assert_eq!(chunk.begin(), VirtualOffset::new(100, 0));
        assert_eq!(chunk.end(), VirtualOffset::new(480, 0));
    }

    #[test]
    fn test_full_scan_chunk_of_empty_index() {
        let records: Vec<AlignmentRecord> = Vec::new();
        let index = BamIndex::build(2, &records).unwrap();
        let chunk = index.full_scan_chunk();
        assert_eq!(chunk.begin(), VirtualOffset::MIN);
        assert_eq!(chunk.end(), VirtualOffset::MAX);
    }

    #[test]
    fn test_from_source() {
        let source = RecordList::new(
            2,
            vec![record(0, 1000, 1050, 100, 150), record(1, 5, 10, 150, 170)],
        );
        let index = BamIndex::from_source(source).unwrap();
        assert_eq!(index.reference_count(), 2);
        assert!(!index.reference(1).unwrap().is_empty());
    }

    #[test]
    fn test_write_and_read() {
        let index = BamIndex::build(1, &[record(0, 1000, 1050, 100, 150)]).unwrap();
        let mut buf = Vec::new();
        index.write_to(&mut buf).unwrap();
        let restored = BamIndex::read_from(buf.as_slice()).unwrap();
        assert_eq!(restored, index);
    }
}
