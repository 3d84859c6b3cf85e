use super::binning::{MAX_COORDINATE, candidate_bins};
use super::chunk::merge_chunks;
use super::{BamIndex, Chunk};
use crate::{Error, Result};

pub(super) fn query(index: &BamIndex, reference_id: usize, start: i64, end: i64) -> Result<Vec<Chunk>> {
    let reference = index.reference(reference_id).ok_or_else(|| {
        Error::InvalidRange(format!(
            "reference id {} out of range (index has {} references)",
            reference_id,
            index.reference_count()
        ))
    })?;

    if start < 0 || end <= start || start >= MAX_COORDINATE {
        return Err(Error::InvalidRange(format!(
            "invalid interval [{}, {})",
            start, end
        )));
    }

    if reference.is_empty() {
        tracing::debug!(reference_id, "no index data for reference, falling back to full scan");
        return Ok(vec![index.full_scan_chunk()]);
    }

    let mut chunks: Vec<Chunk> = candidate_bins(start, end)?
        .into_iter()
        .filter_map(|id| reference.bin(id))
        .flat_map(|bin| bin.chunks().iter().copied())
        .collect();

    if let Some(floor) = reference.linear_floor(start) {
        chunks.retain(|chunk| chunk.end() > floor);
    }

    let chunks = merge_chunks(chunks);
    tracing::trace!(reference_id, start, end, chunks = chunks.len(), "queried index");

    Ok(chunks)
}

/// Queries several `(reference_id, start, end)` regions and merges the chunks
/// into one ascending, disjoint list.
pub fn query_regions(index: &BamIndex, regions: &[(usize, i64, i64)]) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    for &(reference_id, start, end) in regions {
        chunks.extend(index.query(reference_id, start, end)?);
    }
    Ok(merge_chunks(chunks))
}
