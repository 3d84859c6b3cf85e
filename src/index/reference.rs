use super::binning::window_for;
use super::chunk::{is_minimal, merge_chunks};
use super::{Chunk, VirtualOffset};
use std::collections::BTreeMap;

/// A bin of the hierarchical index and the chunks assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bin {
    id: u32,
    chunks: Vec<Chunk>,
}

impl Bin {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            chunks: Vec::new(),
        }
    }

    pub(crate) fn with_chunks(id: u32, chunks: Vec<Chunk>) -> Self {
        Self { id, chunks }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Appends a chunk, extending the last one instead when they overlap or touch.
    pub(crate) fn push_chunk(&mut self, chunk: Chunk) {
        if !self.chunks.last_mut().is_some_and(|last| last.try_merge(&chunk)) {
            self.chunks.push(chunk);
        }
    }

    pub(crate) fn finalize(&mut self) {
        if !is_minimal(&self.chunks) {
            self.chunks = merge_chunks(std::mem::take(&mut self.chunks));
        }
    }

    pub fn is_minimal(&self) -> bool {
        is_minimal(&self.chunks)
    }
}

/// Per-reference statistics stored in the metadata pseudo-bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceMetadata {
    /// Begin of the first record placed on the reference.
    pub start: VirtualOffset,
    /// End of the last record placed on the reference.
    pub end: VirtualOffset,
    pub mapped_record_count: u64,
    pub unmapped_record_count: u64,
}

impl ReferenceMetadata {
    pub(crate) fn record(&mut self, span: Chunk, is_mapped: bool) {
        self.start = self.start.min(span.begin());
        self.end = self.end.max(span.end());
        if is_mapped {
            self.mapped_record_count += 1;
        } else {
            self.unmapped_record_count += 1;
        }
    }
}

/// Binning and linear index of one reference sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceIndex {
    bins: BTreeMap<u32, Bin>,
    linear_index: Vec<Option<VirtualOffset>>,
    metadata: Option<ReferenceMetadata>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        bins: BTreeMap<u32, Bin>,
        linear_index: Vec<Option<VirtualOffset>>,
        metadata: Option<ReferenceMetadata>,
    ) -> Self {
        Self {
            bins,
            linear_index,
            metadata,
        }
    }

    /// Bins in ascending id order.
    pub fn bins(&self) -> impl Iterator<Item = &Bin> {
        self.bins.values()
    }

    pub fn bin(&self, id: u32) -> Option<&Bin> {
        self.bins.get(&id)
    }

    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// One entry per 16 Kbp window; `None` marks a window no record reached.
    pub fn linear_index(&self) -> &[Option<VirtualOffset>] {
        &self.linear_index
    }

    pub fn metadata(&self) -> Option<&ReferenceMetadata> {
        self.metadata.as_ref()
    }

    /// True if no alignment was indexed on this reference.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Lowest offset of any chunk on this reference.
    pub fn min_offset(&self) -> Option<VirtualOffset> {
        self.bins
            .values()
            .flat_map(|bin| bin.chunks.iter())
            .map(Chunk::begin)
            .min()
    }

    /// Highest chunk end on this reference.
    pub fn max_offset(&self) -> Option<VirtualOffset> {
        self.bins
            .values()
            .flat_map(|bin| bin.chunks.iter())
            .map(Chunk::end)
            .max()
    }

    /// Lower bound on the offset of any record overlapping a window at or after
    /// the one containing `start`.
    pub fn linear_floor(&self, start: i64) -> Option<VirtualOffset> {
        self.linear_index
            .get(window_for(start))
            .copied()
            .flatten()
            .or_else(|| self.min_offset())
    }

    pub(crate) fn add_chunk(&mut self, bin_id: u32, chunk: Chunk) {
        self.bins
            .entry(bin_id)
            .or_insert_with(|| Bin::new(bin_id))
            .push_chunk(chunk);
    }

    /// Marks every window touched by `[start, end)` that has no offset yet.
    pub(crate) fn update_linear_index(&mut self, start: i64, end: i64, offset: VirtualOffset) {
        let first = window_for(start);
        let last = window_for(end - 1);
        if self.linear_index.len() <= last {
            self.linear_index.resize(last + 1, None);
        }
        for slot in &mut self.linear_index[first..=last] {
            slot.get_or_insert(offset);
        }
    }

    pub(crate) fn update_metadata(&mut self, span: Chunk, is_mapped: bool) {
        self.metadata
            .get_or_insert(ReferenceMetadata {
                start: span.begin(),
                end: span.end(),
                mapped_record_count: 0,
                unmapped_record_count: 0,
            })
            .record(span, is_mapped);
    }

    pub(crate) fn finalize(&mut self) {
        for bin in self.bins.values_mut() {
            bin.finalize();
        }
    }
}
