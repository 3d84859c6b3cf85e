use super::binning::bin_for;
use super::{BamIndex, ReferenceIndex};
use crate::source::AlignmentRecord;
use crate::{Error, Result};
use tokio::task::JoinSet;

/// Incrementally builds a [`BamIndex`] from coordinate-sorted records.
///
/// The builder is a single writer. The first error poisons it: every later
/// `push` or `finish` fails and no index is produced.
#[derive(Debug)]
pub struct IndexBuilder {
    references: Vec<ReferenceIndex>,
    unplaced_unmapped_record_count: u64,
    last_position: Option<(usize, i64)>,
    record_count: u64,
    poisoned: Option<String>,
}

impl IndexBuilder {
    /// Creates a builder for a file declaring `reference_count` reference sequences.
    pub fn new(reference_count: usize) -> Self {
        Self {
            references: vec![ReferenceIndex::new(); reference_count],
            unplaced_unmapped_record_count: 0,
            last_position: None,
            record_count: 0,
            poisoned: None,
        }
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Adds one record. Records must arrive in non-decreasing (reference, start) order.
    pub fn push(&mut self, record: &AlignmentRecord) -> Result<()> {
        if let Some(reason) = &self.poisoned {
            return Err(Error::Internal(format!(
                "index build already aborted: {}",
                reason
            )));
        }

        match self.insert(record) {
            Ok(()) => {
                self.record_count += 1;
                Ok(())
            }
            Err(e) => {
                if e.is_build_fatal() {
                    tracing::warn!(
                        records = self.record_count,
                        error = %e,
                        "aborting index build"
                    );
                    self.poisoned = Some(e.to_string());
                }
                Err(e)
            }
        }
    }

    fn insert(&mut self, record: &AlignmentRecord) -> Result<()> {
        let Some(reference_id) = record.reference_id else {
            self.unplaced_unmapped_record_count += 1;
            return Ok(());
        };

        if let Some((previous_reference_id, previous_start)) = self.last_position {
            if (reference_id, record.start) < (previous_reference_id, previous_start) {
                return Err(Error::UnsortedInput {
                    previous_reference_id,
                    previous_start,
                    reference_id,
                    start: record.start,
                });
            }
        }

        let reference_count = self.references.len();
        let reference = self.references.get_mut(reference_id).ok_or_else(|| {
            Error::InvalidRange(format!(
                "reference id {} out of range (file declares {} references)",
                reference_id, reference_count
            ))
        })?;

        let bin_id = bin_for(record.start, record.end)?;

        reference.add_chunk(bin_id, record.span);
        reference.update_linear_index(record.start, record.end, record.span.begin());
        reference.update_metadata(record.span, record.is_mapped);

        self.last_position = Some((reference_id, record.start));
        Ok(())
    }

    /// Finalizes every bin and returns the finished index.
    pub fn finish(mut self) -> Result<BamIndex> {
        if let Some(reason) = self.poisoned.take() {
            return Err(Error::Internal(format!(
                "index build already aborted: {}",
                reason
            )));
        }

        for (reference_id, reference) in self.references.iter_mut().enumerate() {
            reference.finalize();
            if !reference.is_empty() {
                tracing::debug!(
                    reference_id,
                    bins = reference.bin_count(),
                    windows = reference.linear_index().len(),
                    "finalized reference index"
                );
            }
        }

        tracing::info!(
            references = self.references.len(),
            records = self.record_count,
            unplaced_unmapped = self.unplaced_unmapped_record_count,
            "built index"
        );

        Ok(BamIndex::from_parts(
            self.references,
            Some(self.unplaced_unmapped_record_count),
        ))
    }

    /// Consumes `records` and builds the index, or fails on the first bad record.
    pub fn build<'a, I>(reference_count: usize, records: I) -> Result<BamIndex>
    where
        I: IntoIterator<Item = &'a AlignmentRecord>,
    {
        let mut builder = Self::new(reference_count);
        for record in records {
            builder.push(record)?;
        }
        builder.finish()
    }
}

/// Builds one reference per task and merges the results.
///
/// Each partition holds the pre-sorted records of a single reference. Records
/// naming another reference, or a reference claimed by two partitions, abort
/// the whole build.
pub async fn build_partitioned(
    reference_count: usize,
    partitions: Vec<(usize, Vec<AlignmentRecord>)>,
) -> Result<BamIndex> {
    let mut claimed = vec![false; reference_count];
    for (reference_id, _) in &partitions {
        match claimed.get_mut(*reference_id) {
            Some(seen) if !*seen => *seen = true,
            Some(_) => {
                return Err(Error::InvalidRange(format!(
                    "reference id {} assigned to more than one partition",
                    reference_id
                )));
            }
            None => {
                return Err(Error::InvalidRange(format!(
                    "reference id {} out of range (file declares {} references)",
                    reference_id, reference_count
                )));
            }
        }
    }

    let mut tasks = JoinSet::new();
    for (reference_id, records) in partitions {
        tasks.spawn_blocking(move || build_reference(reference_id, &records));
    }

    let mut references = vec![ReferenceIndex::new(); reference_count];
    let mut unplaced_unmapped_record_count = 0;

    while let Some(joined) = tasks.join_next().await {
        let (reference_id, reference, unplaced) =
            joined.map_err(|e| Error::Internal(format!("index task failed: {}", e)))??;
        references[reference_id] = reference;
        unplaced_unmapped_record_count += unplaced;
    }

    tracing::info!(references = reference_count, "built partitioned index");

    Ok(BamIndex::from_parts(
        references,
        Some(unplaced_unmapped_record_count),
    ))
}

fn build_reference(
    reference_id: usize,
    records: &[AlignmentRecord],
) -> Result<(usize, ReferenceIndex, u64)> {
    if let Some(stray) = records
        .iter()
        .find(|r| r.reference_id.is_some_and(|id| id != reference_id))
    {
        return Err(Error::InvalidRange(format!(
            "partition for reference {} contains a record on reference {:?}",
            reference_id, stray.reference_id
        )));
    }

    let mut builder = IndexBuilder::new(reference_id + 1);
    for record in records {
        builder.push(record)?;
    }
    let index = builder.finish()?;
    let unplaced = index.unplaced_unmapped_record_count().unwrap_or(0);
    let reference = index
        .into_references()
        .pop()
        .ok_or_else(|| Error::Internal("partition produced no reference".to_string()))?;

    Ok((reference_id, reference, unplaced))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::VirtualOffset;
    use crate::index::Chunk;

    fn record(reference_id: usize, start: i64, end: i64, begin: u64, finish: u64) -> AlignmentRecord {
        AlignmentRecord::mapped(
            reference_id,
            start,
            end,
            Chunk::new(VirtualOffset::new(begin, 0), VirtualOffset::new(finish, 0)).unwrap(),
        )
    }

    #[test]
    fn test_contiguous_records_share_a_chunk() {
        let records = vec![
            record(0, 100, 150, 10, 20),
            record(0, 120, 170, 20, 30),
            record(0, 130, 180, 30, 40),
        ];
        let index = IndexBuilder::build(1, &records).unwrap();
        let bin = index.reference(0).unwrap().bin(4681).unwrap();
        assert_eq!(bin.chunks().len(), 1);
        assert_eq!(bin.chunks()[0].begin(), VirtualOffset::new(10, 0));
        assert_eq!(bin.chunks()[0].end(), VirtualOffset::new(40, 0));
    }

    #[test]
    fn test_unsorted_input_is_rejected() {
        let records = vec![record(0, 500, 600, 10, 20), record(0, 100, 200, 20, 30)];
        let err = IndexBuilder::build(1, &records).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsortedInput {
                previous_start: 500,
                start: 100,
                ..
            }
        ));
    }

    #[test]
    fn test_reference_going_backwards_is_rejected() {
        let mut builder = IndexBuilder::new(2);
        builder.push(&record(1, 10, 20, 10, 20)).unwrap();
        let err = builder.push(&record(0, 500, 600, 20, 30)).unwrap_err();
        assert_eq!(err.error_type(), "UnsortedInput");
    }

    #[test]
    fn test_poisoned_builder_produces_no_index() {
        let mut builder = IndexBuilder::new(1);
        builder.push(&record(0, 500, 600, 10, 20)).unwrap();
        assert!(builder.push(&record(0, 100, 200, 20, 30)).is_err());
        assert!(builder.push(&record(0, 700, 800, 30, 40)).is_err());
        assert!(builder.finish().is_err());
    }

    #[test]
    fn test_invalid_interval_aborts_build() {
        let err = IndexBuilder::build(1, &[record(0, 100, 100, 10, 20)]).unwrap_err();
        assert!(matches!(err, Error::InvalidInterval { start: 100, end: 100 }));
    }

    #[test]
    fn test_unknown_reference_aborts_build() {
        let err = IndexBuilder::build(1, &[record(3, 100, 200, 10, 20)]).unwrap_err();
        assert_eq!(err.error_type(), "InvalidRange");
    }

    #[test]
    fn test_unplaced_records_are_counted() {
        let unplaced = AlignmentRecord::unplaced(
            Chunk::new(VirtualOffset::new(50, 0), VirtualOffset::new(60, 0)).unwrap(),
        );
        let records = vec![record(0, 100, 200, 10, 20), unplaced.clone(), unplaced];
        let index = IndexBuilder::build(1, &records).unwrap();
        assert_eq!(index.unplaced_unmapped_record_count(), Some(2));
        assert_eq!(index.reference(0).unwrap().bin_count(), 1);
    }

    #[test]
    fn test_linear_index_is_monotonic() {
        let mut records = Vec::new();
        let mut offset = 100;
        for i in 0..200i64 {
            let start = i * 3_000;
            let end = start + 100 + (i % 7) * 9_000;
            records.push(record(0, start, end, offset, offset + 10));
            offset += 10;
        }
        let index = IndexBuilder::build(1, &records).unwrap();
        let set: Vec<VirtualOffset> = index
            .reference(0)
            .unwrap()
            .linear_index()
            .iter()
            .flatten()
            .copied()
            .collect();
        assert!(!set.is_empty());
        assert!(set.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_build_partitioned_matches_sequential() {
        let first = vec![record(0, 100, 200, 10, 20), record(0, 20_000, 20_100, 20, 30)];
        let second = vec![record(2, 5_000, 5_100, 30, 40)];
        let all: Vec<AlignmentRecord> = first.iter().chain(second.iter()).cloned().collect();

        let sequential = IndexBuilder::build(3, &all).unwrap();
        let partitioned = build_partitioned(3, vec![(2, second), (0, first)])
            .await
            .unwrap();

        assert_eq!(sequential.references(), partitioned.references());
        assert!(partitioned.reference(1).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_build_partitioned_rejects_duplicate_partition() {
        let err = build_partitioned(
            1,
            vec![
                (0, vec![record(0, 100, 200, 10, 20)]),
                (0, vec![record(0, 300, 400, 20, 30)]),
            ],
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_type(), "InvalidRange");
    }

    #[tokio::test]
    async fn test_build_partitioned_propagates_unsorted_input() {
        let err = build_partitioned(
            1,
            vec![(0, vec![record(0, 500, 600, 10, 20), record(0, 100, 200, 20, 30)])],
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_type(), "UnsortedInput");
    }
}
