//! Byte ranges of the compressed file covering a chunk list.
//!
//! A chunk's end offset points inside a BGZF block whose compressed length the
//! index does not know, so a range ending mid-block is extended by the largest
//! possible block size. Clients fetch these ranges directly (e.g. with HTTP
//! range requests) and hand the bytes to a BGZF decoder.

use crate::index::{Chunk, VirtualOffset};
use serde::Serialize;

/// Largest compressed size of one BGZF block.
pub const MAX_BLOCK_SIZE: u64 = 1 << 16;

/// Byte range within a file; `end` is exclusive, `None` means end of file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    pub start: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
}

impl ByteRange {
    /// Compressed bytes holding every record of `chunk`.
    pub fn from_chunk(chunk: &Chunk) -> Self {
        let end = if chunk.end() == VirtualOffset::MAX {
            None
        } else {
            Some(block_end(chunk.end()))
        };
        Self {
            start: chunk.begin().block_offset(),
            end,
        }
    }

    /// Clamps an open or overlong range to the file size.
    pub fn clamp_to(self, file_size: u64) -> Self {
        Self {
            start: self.start.min(file_size),
            end: Some(self.end.map_or(file_size, |end| end.min(file_size))),
        }
    }
}

fn block_end(offset: VirtualOffset) -> u64 {
    if offset.within_block_offset() == 0 {
        offset.block_offset()
    } else {
        offset.block_offset() + MAX_BLOCK_SIZE
    }
}

/// Header bytes of a BAM file whose first record starts at `header_end`.
pub fn header_range(header_end: VirtualOffset) -> ByteRange {
    ByteRange {
        start: 0,
        end: Some(block_end(header_end)),
    }
}

/// Converts chunks to byte ranges, merging overlapping or adjacent ranges.
pub fn byte_ranges(chunks: &[Chunk]) -> Vec<ByteRange> {
    merge_ranges(chunks.iter().map(ByteRange::from_chunk).collect())
}

/// Merge overlapping or adjacent byte ranges
pub fn merge_ranges(mut ranges: Vec<ByteRange>) -> Vec<ByteRange> {
    if ranges.is_empty() {
        return ranges;
    }

    ranges.sort_by_key(|r| r.start);

    let mut merged = Vec::with_capacity(ranges.len());
    let mut current = ranges[0];

    for range in ranges.into_iter().skip(1) {
        let current_end = current.end.unwrap_or(u64::MAX);

        if range.start <= current_end {
            current.end = match (current.end, range.end) {
                (Some(a), Some(b)) => Some(a.max(b)),
                _ => None,
            };
        } else {
            merged.push(current);
            current = range;
        }
    }
    merged.push(current);

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(begin: (u64, u16), end: (u64, u16)) -> Chunk {
        Chunk::new(
            VirtualOffset::new(begin.0, begin.1),
            VirtualOffset::new(end.0, end.1),
        )
        .unwrap()
    }

    #[test]
    fn test_block_aligned_end_is_exclusive() {
        let range = ByteRange::from_chunk(&chunk((100, 5), (200, 0)));
        assert_eq!(range, ByteRange { start: 100, end: Some(200) });
    }

    #[test]
    fn test_mid_block_end_extends() {
        let range = ByteRange::from_chunk(&chunk((100, 5), (200, 10)));
        assert_eq!(range.end, Some(200 + MAX_BLOCK_SIZE));
    }

    #[test]
    fn test_full_chunk_is_open_ended() {
        let range = ByteRange::from_chunk(&Chunk::FULL);
        assert_eq!(range, ByteRange { start: 0, end: None });
        assert_eq!(range.clamp_to(5000), ByteRange { start: 0, end: Some(5000) });
    }

    #[test]
    fn test_byte_ranges_merge() {
        let ranges = byte_ranges(&[
            chunk((100, 0), (150, 20)),
            chunk((150, 30), (160, 0)),
            chunk((1_000_000, 0), (1_000_100, 0)),
        ]);
        assert_eq!(
            ranges,
            vec![
                ByteRange { start: 100, end: Some(150 + MAX_BLOCK_SIZE) },
                ByteRange { start: 1_000_000, end: Some(1_000_100) },
            ]
        );
    }

    #[test]
    fn test_merge_open_range_absorbs_rest() {
        let merged = merge_ranges(vec![
            ByteRange { start: 10, end: None },
            ByteRange { start: 500, end: Some(600) },
        ]);
        assert_eq!(merged, vec![ByteRange { start: 10, end: None }]);
    }

    #[test]
    fn test_header_range() {
        assert_eq!(header_range(VirtualOffset::new(0, 4000)).end, Some(MAX_BLOCK_SIZE));
        assert_eq!(header_range(VirtualOffset::new(812, 0)).end, Some(812));
    }
}
