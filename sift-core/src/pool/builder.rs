//! Whole-list ingestion on top of block appends

use super::{PostingBatch, SegmentPool};
use crate::compression::{BlockCodec, BLOCK_SIZE};
use crate::{BlockPtr, DocId, Result, SiftError};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Handle to a stored posting list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListHandle {
    /// First block in traversal order
    pub head: BlockPtr,
    /// Last block in traversal order
    pub tail: BlockPtr,
    /// Number of postings
    pub doc_freq: u32,
    /// Largest term frequency in the list (1 without frequencies)
    pub max_frequency: u32,
}

/// Splits a complete posting list into blocks and appends them to a pool
pub struct ListBuilder<'p, 'c> {
    pool: &'p mut SegmentPool,
    codec: &'c dyn BlockCodec,
}

impl<'p, 'c> ListBuilder<'p, 'c> {
    /// Create a builder writing into `pool`
    pub fn new(pool: &'p mut SegmentPool, codec: &'c dyn BlockCodec) -> Self {
        Self { pool, codec }
    }

    /// Store a docID-only list given in traversal order
    pub fn doc_ids(&mut self, doc_ids: &[DocId]) -> Result<ListHandle> {
        self.build(doc_ids, None, None)
    }

    /// Store a list with term frequencies
    pub fn with_frequencies(&mut self, doc_ids: &[DocId], frequencies: &[u32]) -> Result<ListHandle> {
        self.build(doc_ids, Some(frequencies), None)
    }

    /// Store a list with term frequencies and positions
    pub fn positional(
        &mut self,
        doc_ids: &[DocId],
        frequencies: &[u32],
        positions: &[u32],
    ) -> Result<ListHandle> {
        self.build(doc_ids, Some(frequencies), Some(positions))
    }

    fn build(
        &mut self,
        doc_ids: &[DocId],
        frequencies: Option<&[u32]>,
        positions: Option<&[u32]>,
    ) -> Result<ListHandle> {
        if doc_ids.is_empty() {
            return Err(SiftError::InvalidBatch("empty posting list".into()));
        }
        if let Some(frequencies) = frequencies {
            if frequencies.len() != doc_ids.len() {
                return Err(SiftError::InvalidBatch(format!(
                    "{} frequencies for {} docIDs",
                    frequencies.len(),
                    doc_ids.len()
                )));
            }
        }

        // Position offset of every document, plus the end
        let offsets: Option<Vec<usize>> = frequencies.map(|freqs| {
            let mut offsets = Vec::with_capacity(freqs.len() + 1);
            let mut total = 0;
            offsets.push(0);
            for &freq in freqs {
                total += freq as usize;
                offsets.push(total);
            }
            offsets
        });
        if let (Some(positions), Some(offsets)) = (positions, offsets.as_ref()) {
            let expected = offsets[offsets.len() - 1];
            if positions.len() != expected {
                return Err(SiftError::InvalidBatch(format!(
                    "{} positions, frequencies sum to {}",
                    positions.len(),
                    expected
                )));
            }
        }

        let ranges = append_ranges(doc_ids.len(), self.pool.direction().is_descending());

        let mut prior = BlockPtr::NULL;
        let mut first = BlockPtr::NULL;
        for range in ranges {
            let batch = PostingBatch {
                doc_ids: &doc_ids[range.clone()],
                frequencies: frequencies.map(|f| &f[range.clone()]),
                positions: match (positions, offsets.as_ref()) {
                    (Some(p), Some(o)) => Some(&p[o[range.start]..o[range.end]]),
                    _ => None,
                },
            };
            prior = self.pool.append_block(self.codec, batch, prior)?;
            if first.is_null() {
                first = prior;
            }
        }

        let (head, tail) = if self.pool.direction().is_descending() {
            (prior, first)
        } else {
            (first, prior)
        };

        Ok(ListHandle {
            head,
            tail,
            doc_freq: doc_ids.len() as u32,
            max_frequency: frequencies
                .and_then(|f| f.iter().copied().max())
                .unwrap_or(1),
        })
    }
}

/// Block ranges in append order. Descending lists are appended from the
/// back, so their partial block ends up at the head.
fn append_ranges(len: usize, from_back: bool) -> Vec<Range<usize>> {
    let mut ranges = Vec::with_capacity(len.div_ceil(BLOCK_SIZE));
    if from_back {
        let mut end = len;
        while end > 0 {
            let start = end.saturating_sub(BLOCK_SIZE);
            ranges.push(start..end);
            end = start;
        }
    } else {
        let mut start = 0;
        while start < len {
            let end = (start + BLOCK_SIZE).min(len);
            ranges.push(start..end);
            start = end;
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::BitPackCodec;
    use crate::pool::PoolConfig;
    use crate::Direction;

    fn collect(pool: &SegmentPool, head: BlockPtr) -> (Vec<DocId>, Vec<u32>) {
        let codec = BitPackCodec::new();
        let mut docs = Vec::new();
        let mut freqs = Vec::new();
        let mut buf = [0u32; BLOCK_SIZE];
        let mut ptr = head;
        while !ptr.is_null() {
            let n = pool.decompress_doc_ids(&codec, ptr, &mut buf).unwrap();
            docs.extend_from_slice(&buf[..n]);
            pool.decompress_frequencies(&codec, ptr, &mut buf).unwrap();
            freqs.extend_from_slice(&buf[..n]);
            ptr = pool.next_pointer(ptr).unwrap();
        }
        (docs, freqs)
    }

    #[test]
    fn test_build_roundtrip_both_directions() {
        for direction in [Direction::Ascending, Direction::Descending] {
            let mut pool = SegmentPool::new(PoolConfig::default().with_direction(direction)).unwrap();
            let codec = BitPackCodec::new();

            let mut docs: Vec<DocId> = (0..300).map(|i| i * 3 + 2).collect();
            if direction.is_descending() {
                docs.reverse();
            }
            let freqs: Vec<u32> = (0..300).map(|i| i % 5 + 1).collect();

            let handle = ListBuilder::new(&mut pool, &codec)
                .with_frequencies(&docs, &freqs)
                .unwrap();

            assert_eq!(handle.doc_freq, 300);
            assert_eq!(handle.max_frequency, 5);
            assert_eq!(pool.block_count(), 3);
            assert!(pool.next_pointer(handle.tail).unwrap().is_null());
            assert_eq!(collect(&pool, handle.head), (docs, freqs));
        }
    }

    #[test]
    fn test_descending_head_holds_partial_block() {
        let mut pool =
            SegmentPool::new(PoolConfig::default().with_direction(Direction::Descending)).unwrap();
        let codec = BitPackCodec::new();
        let docs: Vec<DocId> = (0..130).rev().collect();

        let handle = ListBuilder::new(&mut pool, &codec).doc_ids(&docs).unwrap();
        assert_eq!(pool.len(handle.head).unwrap(), 2);
        assert_eq!(pool.len(handle.tail).unwrap(), BLOCK_SIZE);
        assert_eq!(pool.bound(handle.tail).unwrap(), 0);
    }

    #[test]
    fn test_positional_list() {
        let mut pool = SegmentPool::new(PoolConfig::default()).unwrap();
        let codec = BitPackCodec::new();
        let docs: Vec<DocId> = (0..200).collect();
        let freqs = vec![2u32; 200];
        let positions: Vec<u32> = (0..200).flat_map(|d| [d, d + 10]).collect();

        let handle = ListBuilder::new(&mut pool, &codec)
            .positional(&docs, &freqs, &positions)
            .unwrap();

        let second = pool.next_pointer(handle.head).unwrap();
        assert_eq!(
            pool.decompress_positions_for_document(&codec, second, 0).unwrap(),
            vec![128, 138]
        );
    }

    #[test]
    fn test_rejects_empty_and_mismatched_lists() {
        let mut pool = SegmentPool::new(PoolConfig::default()).unwrap();
        let codec = BitPackCodec::new();
        let mut builder = ListBuilder::new(&mut pool, &codec);
        assert!(builder.doc_ids(&[]).is_err());
        assert!(builder.with_frequencies(&[1, 2], &[1]).is_err());
        assert!(builder.positional(&[1], &[2], &[1]).is_err());
    }
}
