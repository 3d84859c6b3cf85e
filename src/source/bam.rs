use super::{AlignmentRecord, AlignmentSource};
use crate::index::{Chunk, VirtualOffset};
use crate::{Error, Result};
use noodles::bam;
use noodles::bgzf;
use noodles::sam;
use noodles::sam::alignment::record::Cigar as _;
use std::fs::File;
use std::path::Path;

/// Reads a BAM file through noodles and yields each record with the virtual
/// offsets it occupies. Also decodes query chunks back into records.
pub struct BamRecordSource {
    reader: bam::io::Reader<bgzf::Reader<File>>,
    header: sam::Header,
    header_end: VirtualOffset,
    record: bam::Record,
    done: bool,
}

impl BamRecordSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::NotFound(format!("{}: {}", path.display(), e)))?;

        // bam::io::Reader::new wraps the file in a BGZF reader internally
        let mut reader = bam::io::Reader::new(file);
        let header = reader
            .read_header()
            .map_err(|e| Error::Internal(format!("failed to read BAM header: {}", e)))?;
        let header_end = to_offset(reader.get_ref().virtual_position());

        tracing::debug!(
            path = %path.display(),
            references = header.reference_sequences().len(),
            header_end = %header_end,
            "opened BAM file"
        );

        Ok(Self {
            reader,
            header,
            header_end,
            record: bam::Record::default(),
            done: false,
        })
    }

    pub fn header(&self) -> &sam::Header {
        &self.header
    }

    /// Virtual offset of the first record, right after the header.
    pub fn header_end(&self) -> VirtualOffset {
        self.header_end
    }

    pub fn reference_names(&self) -> Vec<String> {
        self.header
            .reference_sequences()
            .keys()
            .map(|name| name.to_string())
            .collect()
    }

    /// Maps a reference sequence name to its id.
    pub fn reference_id(&self, name: &str) -> Result<usize> {
        self.header
            .reference_sequences()
            .get_index_of(name.as_bytes())
            .ok_or_else(|| Error::NotFound(format!("reference sequence not found: {}", name)))
    }

    /// Decodes every record inside `chunks` and keeps those overlapping
    /// `[start, end)` on `reference_id`.
    ///
    /// Seeking moves the sequential cursor; the source yields no further records
    /// through `Iterator` afterwards.
    pub fn fetch(
        &mut self,
        chunks: &[Chunk],
        reference_id: usize,
        start: i64,
        end: i64,
    ) -> Result<Vec<AlignmentRecord>> {
        let mut hits = Vec::new();

        for chunk in chunks {
            let first = chunk.begin().max(self.header_end);
            self.reader
                .get_mut()
                .seek(bgzf::VirtualPosition::from(first.as_raw()))
                .map_err(|e| Error::Internal(format!("failed to seek to {}: {}", first, e)))?;
            self.done = false;

            while let Some(record) = self.read_next(Some(chunk.end()))? {
                if record.reference_id.is_none() {
                    break;
                }
                if record.overlaps(reference_id, start, end) {
                    hits.push(record);
                }
            }
        }

        self.done = true;
        tracing::debug!(
            reference_id,
            start,
            end,
            chunks = chunks.len(),
            hits = hits.len(),
            "fetched records"
        );

        Ok(hits)
    }

    fn read_next(&mut self, limit: Option<VirtualOffset>) -> Result<Option<AlignmentRecord>> {
        if self.done {
            return Ok(None);
        }

        let begin = to_offset(self.reader.get_ref().virtual_position());
        if limit.is_some_and(|limit| begin >= limit) {
            return Ok(None);
        }

        let n = self
            .reader
            .read_record(&mut self.record)
            .map_err(|e| Error::Internal(format!("failed to read BAM record: {}", e)))?;
        if n == 0 {
            self.done = true;
            return Ok(None);
        }

        let end = to_offset(self.reader.get_ref().virtual_position());
        let span = Chunk::new(begin, end)?;
        convert(&self.record, span).map(Some)
    }
}

fn to_offset(position: bgzf::VirtualPosition) -> VirtualOffset {
    VirtualOffset::from(u64::from(position))
}

fn convert(record: &bam::Record, span: Chunk) -> Result<AlignmentRecord> {
    let reference_id = record
        .reference_sequence_id()
        .transpose()
        .map_err(|e| Error::Internal(format!("invalid reference sequence id: {}", e)))?;
    let position = record
        .alignment_start()
        .transpose()
        .map_err(|e| Error::Internal(format!("invalid alignment start: {}", e)))?;

    let (Some(reference_id), Some(position)) = (reference_id, position) else {
        return Ok(AlignmentRecord::unplaced(span));
    };
    let start = usize::from(position) as i64 - 1;

    if record.flags().is_unmapped() {
        return Ok(AlignmentRecord::placed_unmapped(reference_id, start, span));
    }

    let length = record
        .cigar()
        .alignment_span()
        .map_err(|e| Error::Internal(format!("invalid CIGAR: {}", e)))?;

    // records without reference-consuming operations still occupy one base
    let end = start + (length as i64).max(1);
    Ok(AlignmentRecord::mapped(reference_id, start, end, span))
}

impl Iterator for BamRecordSource {
    type Item = Result<AlignmentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next(None).transpose()
    }
}

impl AlignmentSource for BamRecordSource {
    fn reference_count(&self) -> usize {
        self.header.reference_sequences().len()
    }
}
