use super::VirtualOffset;
use crate::{Error, Result};
use std::fmt;

/// Half-open range `[begin, end)` of virtual offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    begin: VirtualOffset,
    end: VirtualOffset,
}

impl Chunk {
    /// The whole stream, `[MIN, MAX)`.
    pub const FULL: Chunk = Chunk {
        begin: VirtualOffset::MIN,
        end: VirtualOffset::MAX,
    };

    /// Creates a chunk, rejecting empty or reversed ranges.
    pub fn new(begin: VirtualOffset, end: VirtualOffset) -> Result<Self> {
        if begin >= end {
            return Err(Error::InvalidRange(format!(
                "chunk begin {} is not before end {}",
                begin, end
            )));
        }
        Ok(Self { begin, end })
    }

    pub fn begin(&self) -> VirtualOffset {
        self.begin
    }

    pub fn end(&self) -> VirtualOffset {
        self.end
    }

    /// True if the two ranges share an offset or one ends where the other begins.
    pub fn overlaps_or_touches(&self, other: &Chunk) -> bool {
        self.begin <= other.end && other.begin <= self.end
    }

    /// Absorbs `other` into `self` when they overlap or touch.
    pub fn try_merge(&mut self, other: &Chunk) -> bool {
        if !self.overlaps_or_touches(other) {
            return false;
        }
        self.begin = self.begin.min(other.begin);
        self.end = self.end.max(other.end);
        true
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}

/// Sorts chunks by begin and merges every overlapping or touching pair.
///
/// The result is ascending and pairwise disjoint with gaps between neighbours.
pub fn merge_chunks(mut chunks: Vec<Chunk>) -> Vec<Chunk> {
    if chunks.len() < 2 {
        return chunks;
    }

    chunks.sort_unstable_by_key(|c| (c.begin, c.end));

    let mut merged: Vec<Chunk> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if !merged.last_mut().is_some_and(|current| current.try_merge(&chunk)) {
            merged.push(chunk);
        }
    }

    merged
}

/// True if `chunks` is sorted, disjoint and has no touching neighbours.
pub fn is_minimal(chunks: &[Chunk]) -> bool {
    chunks.windows(2).all(|pair| pair[0].end < pair[1].begin)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(begin: u64, end: u64) -> Chunk {
        Chunk::new(VirtualOffset::new(begin, 0), VirtualOffset::new(end, 0)).unwrap()
    }

    #[test]
    fn test_rejects_empty_chunk() {
        let at = VirtualOffset::new(10, 0);
        assert!(Chunk::new(at, at).is_err());
        assert!(Chunk::new(VirtualOffset::new(11, 0), at).is_err());
    }

    #[test]
    fn test_merge_empty_and_single() {
        assert!(merge_chunks(Vec::new()).is_empty());
        assert_eq!(merge_chunks(vec![chunk(1, 2)]), vec![chunk(1, 2)]);
    }

    #[test]
    fn test_merge_overlapping() {
        let merged = merge_chunks(vec![chunk(1500, 2500), chunk(1000, 2000)]);
        assert_eq!(merged, vec![chunk(1000, 2500)]);
    }

    #[test]
    fn test_merge_touching() {
        let merged = merge_chunks(vec![chunk(1000, 2000), chunk(2000, 3000)]);
        assert_eq!(merged, vec![chunk(1000, 3000)]);
    }

    #[test]
    fn test_keeps_gaps() {
        let merged = merge_chunks(vec![
            chunk(3000, 4000),
            chunk(1000, 2000),
            chunk(3500, 4500),
            chunk(1500, 1700),
        ]);
        assert_eq!(merged, vec![chunk(1000, 2000), chunk(3000, 4500)]);
        assert!(is_minimal(&merged));
    }

    #[test]
    fn test_is_minimal_detects_touching() {
        assert!(!is_minimal(&[chunk(1, 2), chunk(2, 3)]));
        assert!(is_minimal(&[chunk(1, 2), chunk(3, 4)]));
    }
}
