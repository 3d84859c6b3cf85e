//! Hierarchical binning scheme of the BAM index.
//!
//! Six levels partition `[0, 2^29)`:
//!
//! | level | bins          | span    |
//! |-------|---------------|---------|
//! | 0     | 0             | 512 Mbp |
//! | 1     | 1-8           | 64 Mbp  |
//! | 2     | 9-72          | 8 Mbp   |
//! | 3     | 73-584        | 1 Mbp   |
//! | 4     | 585-4680      | 128 Kbp |
//! | 5     | 4681-37448    | 16 Kbp  |
//!
//! All scheme parameters derive from [`MIN_SHIFT`] and [`DEPTH`].

use crate::{Error, Result};

/// Width, as a power of two, of the finest bins and of the linear index windows.
pub const MIN_SHIFT: u32 = 14;

/// Number of levels below the root bin.
pub const DEPTH: u32 = 5;

/// Size of one linear index window in base pairs.
pub const WINDOW_SIZE: i64 = 1 << MIN_SHIFT;

/// Exclusive upper bound of indexable coordinates.
pub const MAX_COORDINATE: i64 = 1 << (MIN_SHIFT + 3 * DEPTH);

/// Highest regular bin id.
pub const MAX_BIN_ID: u32 = level_offset(DEPTH + 1) - 1;

/// Pseudo-bin holding per-reference metadata (htslib convention: bin count + 1).
pub const METADATA_BIN_ID: u32 = level_offset(DEPTH + 1) + 1;

/// First bin id of `level`.
pub const fn level_offset(level: u32) -> u32 {
    ((1 << (3 * level)) - 1) / 7
}

const fn level_shift(level: u32) -> u32 {
    MIN_SHIFT + 3 * (DEPTH - level)
}

fn validate(start: i64, end: i64) -> Result<()> {
    if start < 0 || end <= start || start >= MAX_COORDINATE {
        return Err(Error::InvalidInterval { start, end });
    }
    Ok(())
}

/// Returns the deepest bin fully containing the 0-based half-open `[start, end)`.
pub fn bin_for(start: i64, end: i64) -> Result<u32> {
    validate(start, end)?;
    if end > MAX_COORDINATE {
        return Err(Error::InvalidInterval { start, end });
    }

    let last = end - 1;
    for level in (1..=DEPTH).rev() {
        let shift = level_shift(level);
        if start >> shift == last >> shift {
            return Ok(level_offset(level) + (start >> shift) as u32);
        }
    }

    Ok(0)
}

/// Returns, in ascending order, every bin whose span overlaps `[start, end)`.
///
/// `end` is clamped to [`MAX_COORDINATE`] so open-ended queries are accepted.
pub fn candidate_bins(start: i64, end: i64) -> Result<Vec<u32>> {
    validate(start, end)?;
    let last = end.min(MAX_COORDINATE) - 1;

    let mut bins = Vec::new();
    for level in 0..=DEPTH {
        let shift = level_shift(level);
        let offset = level_offset(level);
        let first = offset + (start >> shift) as u32;
        let final_bin = offset + (last >> shift) as u32;
        bins.extend(first..=final_bin);
    }

    Ok(bins)
}

/// Linear index window containing `position`.
pub fn window_for(position: i64) -> usize {
    (position >> MIN_SHIFT) as usize
}

/// Level of a regular bin, or `None` for ids outside the scheme.
pub fn level_of(bin_id: u32) -> Option<u32> {
    if bin_id > MAX_BIN_ID {
        return None;
    }
    (0..=DEPTH).rev().find(|&level| bin_id >= level_offset(level))
}

/// Coordinate span `[start, end)` covered by a regular bin.
pub fn bin_span(bin_id: u32) -> Option<(i64, i64)> {
    let level = level_of(bin_id)?;
    let shift = level_shift(level);
    let start = i64::from(bin_id - level_offset(level)) << shift;
    Some((start, start + (1 << shift)))
}
