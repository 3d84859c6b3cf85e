//! On-disk BAI layout.
//!
//! ```text
//! magic[4]          "BAI\1"
//! n_ref             i32
//! per reference:
//!   n_bin           i32
//!   per bin:
//!     bin           u32
//!     n_chunk       i32
//!     per chunk:    chunk_beg u64, chunk_end u64
//!   n_intv          i32
//!   per window:     ioffset u64 (0 = unset)
//! n_no_coor         u64 (optional)
//! ```
//!
//! All integers are little-endian. Per-reference metadata is stored as the
//! pseudo-bin 37450 with two chunks: the reference's first and last offsets,
//! then the mapped and unmapped record counts.

use super::binning::{MAX_BIN_ID, METADATA_BIN_ID};
use super::{BamIndex, Bin, Chunk, ReferenceIndex, ReferenceMetadata, VirtualOffset};
use crate::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::BTreeMap;

pub const MAGIC: [u8; 4] = *b"BAI\x01";

const METADATA_CHUNK_COUNT: i32 = 2;

pub(super) fn encode(index: &BamIndex) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_slice(&MAGIC);
    put_count(&mut buf, index.reference_count());

    for reference in index.references() {
        encode_reference(&mut buf, reference);
    }

    if let Some(count) = index.unplaced_unmapped_record_count() {
        buf.put_u64_le(count);
    }

    tracing::debug!(
        references = index.reference_count(),
        bytes = buf.len(),
        "encoded index"
    );

    buf.freeze()
}

fn encode_reference(buf: &mut BytesMut, reference: &ReferenceIndex) {
    let metadata = reference.metadata().filter(|_| !reference.is_empty());
    put_count(buf, reference.bin_count() + usize::from(metadata.is_some()));

    for bin in reference.bins() {
        buf.put_u32_le(bin.id());
        put_count(buf, bin.chunks().len());
        for chunk in bin.chunks() {
            buf.put_u64_le(chunk.begin().as_raw());
            buf.put_u64_le(chunk.end().as_raw());
        }
    }

    if let Some(metadata) = metadata {
        buf.put_u32_le(METADATA_BIN_ID);
        buf.put_i32_le(METADATA_CHUNK_COUNT);
        buf.put_u64_le(metadata.start.as_raw());
        buf.put_u64_le(metadata.end.as_raw());
        buf.put_u64_le(metadata.mapped_record_count);
        buf.put_u64_le(metadata.unmapped_record_count);
    }

    put_count(buf, reference.linear_index().len());
    for offset in reference.linear_index() {
        buf.put_u64_le(offset.map_or(0, VirtualOffset::as_raw));
    }
}

fn put_count(buf: &mut BytesMut, n: usize) {
    // counts are bounded by the bin scheme and the 2^29 coordinate space
    buf.put_i32_le(n as i32);
}

pub(super) fn decode(data: &[u8]) -> Result<BamIndex> {
    let mut buf = data;

    if buf.remaining() < MAGIC.len() || buf[..MAGIC.len()] != MAGIC {
        return Err(Error::CorruptIndex("invalid BAI magic".to_string()));
    }
    buf.advance(MAGIC.len());

    let reference_count = take_count(&mut buf, "reference count")?;
    let mut references = Vec::with_capacity(reference_count.min(1 << 16));
    for reference_id in 0..reference_count {
        let reference = decode_reference(&mut buf).map_err(|e| match e {
            Error::CorruptIndex(msg) => {
                Error::CorruptIndex(format!("reference {}: {}", reference_id, msg))
            }
            other => other,
        })?;
        references.push(reference);
    }

    let unplaced_unmapped_record_count = match buf.remaining() {
        0 => None,
        n if n < 8 => {
            return Err(Error::CorruptIndex(
                "truncated unplaced record count".to_string(),
            ));
        }
        _ => Some(buf.get_u64_le()),
    };

    if buf.has_remaining() {
        return Err(Error::CorruptIndex(format!(
            "{} trailing bytes after index",
            buf.remaining()
        )));
    }

    tracing::debug!(references = reference_count, "decoded index");

    Ok(BamIndex::from_parts(
        references,
        unplaced_unmapped_record_count,
    ))
}

fn decode_reference(buf: &mut &[u8]) -> Result<ReferenceIndex> {
    let bin_count = take_count(buf, "bin count")?;
    let mut bins = BTreeMap::new();
    let mut metadata = None;

    for _ in 0..bin_count {
        let id = take_u32(buf, "bin id")?;
        let chunk_count = take_count(buf, "chunk count")?;

        if id == METADATA_BIN_ID && chunk_count == METADATA_CHUNK_COUNT as usize {
            metadata = Some(ReferenceMetadata {
                start: VirtualOffset::from(take_u64(buf, "metadata")?),
                end: VirtualOffset::from(take_u64(buf, "metadata")?),
                mapped_record_count: take_u64(buf, "metadata")?,
                unmapped_record_count: take_u64(buf, "metadata")?,
            });
            continue;
        }

        if id > MAX_BIN_ID {
            return Err(Error::CorruptIndex(format!("bin id {} out of range", id)));
        }

        let mut chunks = Vec::with_capacity(chunk_count.min(1 << 16));
        for _ in 0..chunk_count {
            let begin = VirtualOffset::from(take_u64(buf, "chunk begin")?);
            let end = VirtualOffset::from(take_u64(buf, "chunk end")?);
            let chunk = Chunk::new(begin, end)
                .map_err(|_| Error::CorruptIndex(format!("empty chunk {}-{} in bin {}", begin, end, id)))?;
            chunks.push(chunk);
        }

        // files from other writers are not guaranteed to be sorted or merged
        let mut bin = Bin::with_chunks(id, chunks);
        bin.finalize();

        if bins.insert(id, bin).is_some() {
            return Err(Error::CorruptIndex(format!("duplicate bin {}", id)));
        }
    }

    let window_count = take_count(buf, "linear index size")?;
    let mut linear_index = Vec::with_capacity(window_count.min(1 << 16));
    for _ in 0..window_count {
        let raw = take_u64(buf, "linear index entry")?;
        // no record starts at offset 0, the header is there
        linear_index.push((raw != 0).then(|| VirtualOffset::from(raw)));
    }

    Ok(ReferenceIndex::from_parts(bins, linear_index, metadata))
}

fn take_count(buf: &mut &[u8], what: &str) -> Result<usize> {
    if buf.remaining() < 4 {
        return Err(truncated(what));
    }
    let n = buf.get_i32_le();
    usize::try_from(n).map_err(|_| Error::CorruptIndex(format!("negative {}: {}", what, n)))
}

fn take_u32(buf: &mut &[u8], what: &str) -> Result<u32> {
    if buf.remaining() < 4 {
        return Err(truncated(what));
    }
    Ok(buf.get_u32_le())
}

fn take_u64(buf: &mut &[u8], what: &str) -> Result<u64> {
    if buf.remaining() < 8 {
        return Err(truncated(what));
    }
    Ok(buf.get_u64_le())
}

fn truncated(what: &str) -> Error {
    Error::CorruptIndex(format!("unexpected end of data reading {}", what))
}
