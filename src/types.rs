use crate::index::{Chunk, ReferenceIndex};
use crate::ranges::ByteRange;
use serde::Serialize;

/// Genomic region, 0-based half-open; missing bounds mean the whole reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub reference_name: String,
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl Region {
    /// Bounds for an index query.
    pub fn interval(&self) -> (i64, i64) {
        let start = self.start.map_or(0, |s| s as i64);
        let end = self.end.map_or(i64::MAX, |e| e as i64);
        (start, end)
    }
}

/// Chunk as reported by the CLI
#[derive(Debug, Serialize)]
pub struct ChunkEntry {
    pub begin: String,
    pub end: String,
}

impl From<&Chunk> for ChunkEntry {
    fn from(chunk: &Chunk) -> Self {
        Self {
            begin: chunk.begin().to_string(),
            end: chunk.end().to_string(),
        }
    }
}

/// Result of a region query
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    #[serde(rename = "referenceName")]
    pub reference_name: String,
    #[serde(rename = "referenceId")]
    pub reference_id: usize,
    pub start: i64,
    pub end: i64,
    pub chunks: Vec<ChunkEntry>,
    #[serde(rename = "byteRanges")]
    pub byte_ranges: Vec<ByteRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
}

/// Per-reference summary of an index
#[derive(Debug, Serialize)]
pub struct ReferenceStats {
    pub name: String,
    pub bins: usize,
    pub chunks: usize,
    pub windows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapped: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmapped: Option<u64>,
}

impl ReferenceStats {
    pub fn new(name: String, reference: &ReferenceIndex) -> Self {
        let metadata = reference.metadata();
        Self {
            name,
            bins: reference.bin_count(),
            chunks: reference.bins().map(|bin| bin.chunks().len()).sum(),
            windows: reference.linear_index().len(),
            mapped: metadata.map(|m| m.mapped_record_count),
            unmapped: metadata.map(|m| m.unmapped_record_count),
        }
    }
}

/// Whole-index summary
#[derive(Debug, Serialize)]
pub struct IndexStats {
    pub references: Vec<ReferenceStats>,
    #[serde(rename = "unplacedUnmapped", skip_serializing_if = "Option::is_none")]
    pub unplaced_unmapped: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_interval() {
        let region = Region {
            reference_name: "chr1".to_string(),
            start: Some(1000),
            end: Some(2000),
        };
        assert_eq!(region.interval(), (1000, 2000));

        let whole = Region {
            reference_name: "chrM".to_string(),
            start: None,
            end: None,
        };
        assert_eq!(whole.interval(), (0, i64::MAX));
    }

    #[test]
    fn test_query_response_json() {
        let response = QueryResponse {
            reference_name: "chr1".to_string(),
            reference_id: 0,
            start: 0,
            end: 100,
            chunks: vec![],
            byte_ranges: vec![ByteRange { start: 0, end: None }],
            records: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["referenceName"], "chr1");
        assert_eq!(value["byteRanges"][0]["start"], 0);
        assert!(value.get("records").is_none());
        assert!(value["byteRanges"][0].get("end").is_none());
    }
}
