//! Producers of coordinate-sorted alignment records.
//!
//! The index consumes only coordinates and virtual-offset spans; decoding is
//! left to the implementations here.
//!
//! # Implementations
//!
//! - [`RecordList`] - records already in memory
//! - [`BamRecordSource`] - a BAM file read through noodles

mod bam;

pub use bam::BamRecordSource;

use crate::Result;
use crate::index::Chunk;

/// Placement of one alignment record and its location in the compressed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentRecord {
    /// Reference sequence; `None` for records without a coordinate.
    pub reference_id: Option<usize>,
    /// 0-based start on the reference.
    pub start: i64,
    /// Exclusive end on the reference.
    pub end: i64,
    /// Virtual offsets `[begin, end)` occupied by the record.
    pub span: Chunk,
    /// False for placed records flagged unmapped.
    pub is_mapped: bool,
}

impl AlignmentRecord {
    pub fn mapped(reference_id: usize, start: i64, end: i64, span: Chunk) -> Self {
        Self {
            reference_id: Some(reference_id),
            start,
            end,
            span,
            is_mapped: true,
        }
    }

    /// A record placed on a reference (usually at its mate) but flagged unmapped.
    pub fn placed_unmapped(reference_id: usize, start: i64, span: Chunk) -> Self {
        Self {
            reference_id: Some(reference_id),
            start,
            end: start + 1,
            span,
            is_mapped: false,
        }
    }

    /// A record with no reference coordinate.
    pub fn unplaced(span: Chunk) -> Self {
        Self {
            reference_id: None,
            start: -1,
            end: -1,
            span,
            is_mapped: false,
        }
    }

    pub fn has_coordinate(&self) -> bool {
        self.reference_id.is_some()
    }

    /// Exact overlap test used to re-filter records decoded from query chunks.
    pub fn overlaps(&self, reference_id: usize, start: i64, end: i64) -> bool {
        self.reference_id == Some(reference_id) && self.start < end && start < self.end
    }
}

/// Capability of producing coordinate-sorted records with their virtual offsets.
pub trait AlignmentSource: Iterator<Item = Result<AlignmentRecord>> {
    /// Number of reference sequences declared by the source.
    fn reference_count(&self) -> usize;
}

/// In-memory record source.
#[derive(Debug, Clone)]
pub struct RecordList {
    reference_count: usize,
    records: std::vec::IntoIter<AlignmentRecord>,
}

impl RecordList {
    pub fn new(reference_count: usize, records: Vec<AlignmentRecord>) -> Self {
        Self {
            reference_count,
            records: records.into_iter(),
        }
    }
}

impl Iterator for RecordList {
    type Item = Result<AlignmentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next().map(Ok)
    }
}

impl AlignmentSource for RecordList {
    fn reference_count(&self) -> usize {
        self.reference_count
    }
}
