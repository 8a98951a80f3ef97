//! Segment pool: block appends, chain navigation and decompression

use super::block::{self, BlockHeader, BlockRef, HEADER_WORDS};
use super::bloom::BloomFilter;
use super::{PoolConfig, PoolStats};
use crate::compression::{delta_encode, padded_block, BlockCodec, BLOCK_SIZE};
use crate::{BlockPtr, BlockShape, DocId, Direction, Result, SiftError};
use tracing::debug;

/// Raw postings for one block, in the list's traversal order
#[derive(Debug, Clone, Copy)]
pub struct PostingBatch<'a> {
    /// DocIDs, strictly monotonic in the list's direction
    pub doc_ids: &'a [DocId],
    /// Term frequency per docID
    pub frequencies: Option<&'a [u32]>,
    /// Positions of all documents concatenated; `frequencies[i]` per document
    pub positions: Option<&'a [u32]>,
}

impl<'a> PostingBatch<'a> {
    /// DocIDs only
    pub fn doc_ids(doc_ids: &'a [DocId]) -> Self {
        Self {
            doc_ids,
            frequencies: None,
            positions: None,
        }
    }

    /// DocIDs with term frequencies
    pub fn with_frequencies(doc_ids: &'a [DocId], frequencies: &'a [u32]) -> Self {
        Self {
            doc_ids,
            frequencies: Some(frequencies),
            positions: None,
        }
    }

    /// DocIDs with term frequencies and positions
    pub fn positional(doc_ids: &'a [DocId], frequencies: &'a [u32], positions: &'a [u32]) -> Self {
        Self {
            doc_ids,
            frequencies: Some(frequencies),
            positions: Some(positions),
        }
    }

    /// Payload sections this batch produces
    pub fn shape(&self) -> BlockShape {
        match (self.frequencies.is_some(), self.positions.is_some()) {
            (false, _) => BlockShape::DocIds,
            (true, false) => BlockShape::Frequencies,
            (true, true) => BlockShape::Positional,
        }
    }
}

/// Append-only arena of fixed-capacity segments holding compressed blocks
#[derive(Debug, Clone)]
pub struct SegmentPool {
    pub(super) config: PoolConfig,
    pub(super) segments: Vec<Vec<u32>>,
    pub(super) blocks: usize,
}

impl SegmentPool {
    /// Create an empty pool
    pub fn new(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            segments: Vec::new(),
            blocks: 0,
        })
    }

    /// Pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Traversal order of every list in the pool
    pub fn direction(&self) -> Direction {
        self.config.direction
    }

    /// Number of allocated segments
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of blocks written
    pub fn block_count(&self) -> usize {
        self.blocks
    }

    /// Words occupied by blocks across all segments
    pub fn words_used(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    /// Storage statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            segments: self.segments.len(),
            blocks: self.blocks,
            words_used: self.words_used(),
            words_allocated: self.segments.len() * self.config.segment_words,
        }
    }

    /// Drop every segment. All outstanding pointers become invalid.
    pub fn reset(&mut self) {
        self.segments.clear();
        self.blocks = 0;
    }

    /// Append a block of docIDs
    pub fn append_doc_ids(
        &mut self,
        codec: &dyn BlockCodec,
        doc_ids: &[DocId],
        prior: BlockPtr,
    ) -> Result<BlockPtr> {
        self.append_block(codec, PostingBatch::doc_ids(doc_ids), prior)
    }

    /// Append a block of docIDs with term frequencies
    pub fn append_with_frequencies(
        &mut self,
        codec: &dyn BlockCodec,
        doc_ids: &[DocId],
        frequencies: &[u32],
        prior: BlockPtr,
    ) -> Result<BlockPtr> {
        self.append_block(codec, PostingBatch::with_frequencies(doc_ids, frequencies), prior)
    }

    /// Append a block of docIDs with term frequencies and positions
    pub fn append_positional(
        &mut self,
        codec: &dyn BlockCodec,
        doc_ids: &[DocId],
        frequencies: &[u32],
        positions: &[u32],
        prior: BlockPtr,
    ) -> Result<BlockPtr> {
        self.append_block(
            codec,
            PostingBatch::positional(doc_ids, frequencies, positions),
            prior,
        )
    }

    /// Compress `batch` into a new block and link it after `prior`.
    ///
    /// `prior` is the block most recently appended to the same list, or
    /// `BlockPtr::NULL` for a new list. For ascending lists the new block
    /// becomes the tail; for descending lists it becomes the new head.
    /// Returns the pointer of the new block.
    pub fn append_block(
        &mut self,
        codec: &dyn BlockCodec,
        batch: PostingBatch<'_>,
        prior: BlockPtr,
    ) -> Result<BlockPtr> {
        self.validate_batch(codec, &batch, prior)?;

        let mut words = self.encode_block(codec, &batch)?;
        let ptr = self.reserve(words.len())?;

        match self.config.direction {
            Direction::Ascending => {
                self.write_block(ptr, &words);
                self.link_as_new_tail(prior, ptr)?;
            }
            Direction::Descending => {
                self.link_as_new_head(&mut words, prior);
                self.write_block(ptr, &words);
            }
        }
        self.blocks += 1;

        debug!(
            block = %ptr,
            count = batch.doc_ids.len(),
            words = words.len(),
            "Appended block"
        );

        Ok(ptr)
    }

    /// Ascending growth: the prior tail now points at the new block
    fn link_as_new_tail(&mut self, prior: BlockPtr, new_tail: BlockPtr) -> Result<()> {
        if prior.is_null() {
            return Ok(());
        }
        let words = self.block_words_mut(prior)?;
        block::write_pointer(words, new_tail);
        Ok(())
    }

    /// Descending growth: the new block points at the prior head
    fn link_as_new_head(&self, words: &mut [u32], prior: BlockPtr) {
        block::write_pointer(words, prior);
    }

    fn validate_batch(
        &self,
        codec: &dyn BlockCodec,
        batch: &PostingBatch<'_>,
        prior: BlockPtr,
    ) -> Result<()> {
        let doc_ids = batch.doc_ids;
        let direction = self.config.direction;

        if doc_ids.is_empty() {
            return Err(SiftError::InvalidBatch("empty batch".into()));
        }
        if doc_ids.len() > BLOCK_SIZE {
            return Err(SiftError::InvalidBatch(format!(
                "{} postings exceed block size {}",
                doc_ids.len(),
                BLOCK_SIZE
            )));
        }
        if let Some(pair) = doc_ids
            .windows(2)
            .find(|pair| !direction.precedes(pair[0], pair[1]))
        {
            return Err(SiftError::InvalidBatch(format!(
                "docIDs {} and {} are not strictly {}",
                pair[0], pair[1], direction
            )));
        }

        if let Some(frequencies) = batch.frequencies {
            if frequencies.len() != doc_ids.len() {
                return Err(SiftError::InvalidBatch(format!(
                    "{} frequencies for {} docIDs",
                    frequencies.len(),
                    doc_ids.len()
                )));
            }
            if frequencies.contains(&0) {
                return Err(SiftError::InvalidBatch("zero term frequency".into()));
            }
            if let Some(positions) = batch.positions {
                let expected: u64 = frequencies.iter().map(|&f| f as u64).sum();
                if expected != positions.len() as u64 {
                    return Err(SiftError::InvalidBatch(format!(
                        "{} positions, frequencies sum to {}",
                        positions.len(),
                        expected
                    )));
                }
                let mut offset = 0;
                for &freq in frequencies {
                    let group = &positions[offset..offset + freq as usize];
                    if group.windows(2).any(|pair| pair[0] >= pair[1]) {
                        return Err(SiftError::InvalidBatch(
                            "positions within a document must be strictly increasing".into(),
                        ));
                    }
                    offset += freq as usize;
                }
            }
        } else if batch.positions.is_some() {
            return Err(SiftError::InvalidBatch(
                "positions require frequencies".into(),
            ));
        }

        if !prior.is_null() {
            let (ordered, edge) = match direction {
                // The new tail starts after the prior tail's bound
                Direction::Ascending => {
                    let prior_bound = self.bound(prior)?;
                    (direction.precedes(prior_bound, doc_ids[0]), prior_bound)
                }
                // The new head ends before the prior head's first docID
                Direction::Descending => {
                    let mut buf = [0u32; BLOCK_SIZE];
                    self.decompress_doc_ids(codec, prior, &mut buf)?;
                    let bound = doc_ids[doc_ids.len() - 1];
                    (direction.precedes(bound, buf[0]), buf[0])
                }
            };
            if !ordered {
                return Err(SiftError::InvalidBatch(format!(
                    "block overlaps the prior block at docID {} ({})",
                    edge, direction
                )));
            }
        }

        Ok(())
    }

    fn encode_block(&self, codec: &dyn BlockCodec, batch: &PostingBatch<'_>) -> Result<Vec<u32>> {
        let count = batch.doc_ids.len();
        let descending = self.config.direction.is_descending();

        // Storage order is always increasing docID order
        let mut doc_ids = batch.doc_ids.to_vec();
        let mut frequencies = batch.frequencies.map(<[u32]>::to_vec);
        if descending {
            doc_ids.reverse();
            if let Some(frequencies) = frequencies.as_mut() {
                frequencies.reverse();
            }
        }

        let mut words = vec![0u32; HEADER_WORDS];

        let bloom = self
            .config
            .bloom
            .map(|cfg| BloomFilter::from_keys(&doc_ids, cfg.bits_per_element as usize, cfg.hash_count));

        delta_encode(&mut doc_ids);
        let start = words.len();
        codec.encode(&padded_block(&doc_ids), &mut words);
        let doc_words = words.len() - start;

        let start = words.len();
        if let Some(frequencies) = frequencies.as_ref() {
            codec.encode(&padded_block(frequencies), &mut words);
        }
        let freq_words = words.len() - start;

        let start = words.len();
        if let (Some(positions), Some(frequencies)) = (batch.positions, batch.frequencies) {
            let stored = storage_positions(positions, frequencies, descending);
            encode_positions(codec, &stored, &mut words);
        }
        let position_words = words.len() - start;

        let start = words.len();
        if let Some(bloom) = bloom.as_ref() {
            words.extend_from_slice(bloom.as_words());
        }
        let bloom_words = words.len() - start;

        let header = BlockHeader {
            total_words: words.len() as u32,
            next: BlockPtr::NULL,
            bound: batch.doc_ids[count - 1],
            shape: batch.shape(),
            has_bloom: bloom.is_some(),
            count: count as u32,
            doc_words: doc_words as u32,
            freq_words: freq_words as u32,
            position_words: position_words as u32,
            bloom_words: bloom_words as u32,
        };
        header.write(&mut words);

        Ok(words)
    }

    /// Find room for `words` words, opening a new segment when the
    /// active one cannot hold the whole block
    fn reserve(&mut self, words: usize) -> Result<BlockPtr> {
        let capacity = self.config.segment_words;
        if words > capacity {
            return Err(SiftError::BlockTooLarge { words, capacity });
        }

        let needs_segment = self
            .segments
            .last()
            .map_or(true, |segment| capacity - segment.len() < words);
        if needs_segment {
            self.segments.push(Vec::with_capacity(capacity));
            debug!(
                segment = self.segments.len() - 1,
                capacity, "Allocated segment"
            );
        }

        let segment = self.segments.len() - 1;
        let offset = self.segments[segment].len();
        Ok(BlockPtr::new(segment as u32, offset as u32))
    }

    fn write_block(&mut self, ptr: BlockPtr, words: &[u32]) {
        let segment = &mut self.segments[ptr.segment() as usize];
        debug_assert_eq!(segment.len(), ptr.offset() as usize);
        segment.extend_from_slice(words);
    }

    fn block_words_mut(&mut self, ptr: BlockPtr) -> Result<&mut [u32]> {
        let total = self.block(ptr)?.header.total_words as usize;
        let offset = ptr.offset() as usize;
        self.segments
            .get_mut(ptr.segment() as usize)
            .and_then(|segment| segment.get_mut(offset..offset + total))
            .ok_or(SiftError::InvalidPointer(ptr.raw()))
    }

    /// Borrow the block at `ptr`
    pub fn block(&self, ptr: BlockPtr) -> Result<BlockRef<'_>> {
        let words = self
            .segments
            .get(ptr.segment() as usize)
            .and_then(|segment| segment.get(ptr.offset() as usize..))
            .filter(|words| !words.is_empty())
            .ok_or(SiftError::InvalidPointer(ptr.raw()))?;
        BlockRef::parse(words)
    }

    /// Header of the block at `ptr`
    pub fn header(&self, ptr: BlockPtr) -> Result<BlockHeader> {
        Ok(self.block(ptr)?.header)
    }

    /// Bound docID of the block at `ptr`
    pub fn bound(&self, ptr: BlockPtr) -> Result<DocId> {
        Ok(self.block(ptr)?.header.bound)
    }

    /// Number of postings in the block at `ptr`
    pub fn len(&self, ptr: BlockPtr) -> Result<usize> {
        Ok(self.block(ptr)?.len())
    }

    /// Follow the next-block link once
    pub fn next_pointer(&self, ptr: BlockPtr) -> Result<BlockPtr> {
        Ok(self.block(ptr)?.header.next)
    }

    /// Follow next-block links from `ptr` while the reached block's bound
    /// still precedes `pivot`. Returns the first block that may contain
    /// `pivot`, or `BlockPtr::NULL`.
    pub fn next_pointer_to(&self, ptr: BlockPtr, pivot: DocId) -> Result<BlockPtr> {
        let direction = self.config.direction;
        let mut current = self.next_pointer(ptr)?;
        while !current.is_null() {
            let header = self.header(current)?;
            if !direction.precedes(header.bound, pivot) {
                break;
            }
            current = header.next;
        }
        Ok(current)
    }

    /// Decode the docIDs of a block into `out`, in traversal order.
    /// Returns the number of postings.
    pub fn decompress_doc_ids(
        &self,
        codec: &dyn BlockCodec,
        ptr: BlockPtr,
        out: &mut [u32; BLOCK_SIZE],
    ) -> Result<usize> {
        let block = self.block(ptr)?;
        let count = block.len();
        codec.decode(block.doc_payload(), out)?;

        match self.config.direction {
            Direction::Ascending => {
                for i in 1..count {
                    out[i] = out[i].wrapping_add(out[i - 1]);
                }
            }
            Direction::Descending => {
                // out[0] holds the smallest docID; rebuild it at the far end
                out[..count].reverse();
                for i in (0..count - 1).rev() {
                    out[i] = out[i].wrapping_add(out[i + 1]);
                }
            }
        }

        Ok(count)
    }

    /// Decode the term frequencies of a block into `out`, in traversal order
    pub fn decompress_frequencies(
        &self,
        codec: &dyn BlockCodec,
        ptr: BlockPtr,
        out: &mut [u32; BLOCK_SIZE],
    ) -> Result<usize> {
        let block = self.block(ptr)?;
        let count = self.storage_frequencies(codec, &block, out)?;
        if self.config.direction.is_descending() {
            out[..count].reverse();
        }
        Ok(count)
    }

    /// Decode every position of a block, grouped per document in
    /// traversal order
    pub fn decompress_positions(&self, codec: &dyn BlockCodec, ptr: BlockPtr) -> Result<Vec<u32>> {
        let block = self.block(ptr)?;
        let section = block.positions()?.ok_or_else(|| missing_section(ptr, "position"))?;

        let mut frequencies = [0u32; BLOCK_SIZE];
        let count = self.storage_frequencies(codec, &block, &mut frequencies)?;

        let mut flat = Vec::with_capacity(section.total);
        let mut chunk = [0u32; BLOCK_SIZE];
        for index in 0..section.sub_block_count() {
            let payload = section
                .sub_block(index)
                .ok_or_else(|| missing_section(ptr, "position sub-block"))?;
            codec.decode(payload, &mut chunk)?;
            flat.extend_from_slice(&chunk[..section.sub_block_len(index)]);
        }

        let mut groups = Vec::with_capacity(count);
        let mut offset = 0;
        for &freq in &frequencies[..count] {
            let end = offset + freq as usize;
            let group = flat
                .get_mut(offset..end)
                .ok_or_else(|| SiftError::Corruption("positions shorter than frequencies".into()))?;
            crate::compression::prefix_sum(group);
            groups.push(offset..end);
            offset = end;
        }

        if self.config.direction.is_descending() {
            groups.reverse();
        }
        Ok(groups.into_iter().flat_map(|range| flat[range].iter().copied()).collect())
    }

    /// Decode the positions of the `index`-th document of a block
    /// (traversal order), touching only the sub-blocks that hold them
    pub fn decompress_positions_for_document(
        &self,
        codec: &dyn BlockCodec,
        ptr: BlockPtr,
        index: usize,
    ) -> Result<Vec<u32>> {
        let block = self.block(ptr)?;
        let count = block.len();
        if index >= count {
            return Err(SiftError::Query(format!(
                "document index {} outside block of {} postings",
                index, count
            )));
        }
        let section = block.positions()?.ok_or_else(|| missing_section(ptr, "position"))?;

        let mut frequencies = [0u32; BLOCK_SIZE];
        self.storage_frequencies(codec, &block, &mut frequencies)?;

        let stored = match self.config.direction {
            Direction::Ascending => index,
            Direction::Descending => count - 1 - index,
        };
        let start: usize = frequencies[..stored].iter().map(|&f| f as usize).sum();
        let end = start + frequencies[stored] as usize;
        if end > section.total {
            return Err(SiftError::Corruption("positions shorter than frequencies".into()));
        }

        let mut positions = Vec::with_capacity(end - start);
        let mut chunk = [0u32; BLOCK_SIZE];
        for sub in start / BLOCK_SIZE..end.div_ceil(BLOCK_SIZE) {
            let payload = section
                .sub_block(sub)
                .ok_or_else(|| missing_section(ptr, "position sub-block"))?;
            codec.decode(payload, &mut chunk)?;

            let base = sub * BLOCK_SIZE;
            let from = start.max(base) - base;
            let to = end.min(base + BLOCK_SIZE) - base;
            positions.extend_from_slice(&chunk[from..to]);
        }

        crate::compression::prefix_sum(&mut positions);
        Ok(positions)
    }

    /// Frequencies in storage (increasing docID) order
    fn storage_frequencies(
        &self,
        codec: &dyn BlockCodec,
        block: &BlockRef<'_>,
        out: &mut [u32; BLOCK_SIZE],
    ) -> Result<usize> {
        let payload = block
            .freq_payload()
            .ok_or_else(|| SiftError::Query("block carries no frequency payload".into()))?;
        codec.decode(payload, out)?;
        Ok(block.len())
    }
}

fn missing_section(ptr: BlockPtr, section: &str) -> SiftError {
    SiftError::Query(format!("block {} carries no {} section", ptr, section))
}

/// Reorder per-document position groups into storage order and delta
/// encode each group
fn storage_positions(positions: &[u32], frequencies: &[u32], descending: bool) -> Vec<u32> {
    let mut groups = Vec::with_capacity(frequencies.len());
    let mut offset = 0;
    for &freq in frequencies {
        groups.push(&positions[offset..offset + freq as usize]);
        offset += freq as usize;
    }
    if descending {
        groups.reverse();
    }

    let mut stored = Vec::with_capacity(positions.len());
    for group in groups {
        let start = stored.len();
        stored.extend_from_slice(group);
        delta_encode(&mut stored[start..]);
    }
    stored
}

fn encode_positions(codec: &dyn BlockCodec, stored: &[u32], words: &mut Vec<u32>) {
    let chunks = stored.len().div_ceil(BLOCK_SIZE);
    words.push(stored.len() as u32);
    words.push(chunks as u32);

    for chunk in stored.chunks(BLOCK_SIZE) {
        let len_slot = words.len();
        words.push(0);
        codec.encode(&padded_block(chunk), words);
        words[len_slot] = (words.len() - len_slot - 1) as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{BitPackCodec, Lz4Codec};
    use crate::pool::BloomConfig;

    fn pool(direction: Direction) -> SegmentPool {
        SegmentPool::new(PoolConfig::default().with_direction(direction)).unwrap()
    }

    fn decode_list(pool: &SegmentPool, head: BlockPtr) -> Vec<DocId> {
        let codec = BitPackCodec::new();
        let mut docs = Vec::new();
        let mut buf = [0u32; BLOCK_SIZE];
        let mut ptr = head;
        while !ptr.is_null() {
            let n = pool.decompress_doc_ids(&codec, ptr, &mut buf).unwrap();
            docs.extend_from_slice(&buf[..n]);
            ptr = pool.next_pointer(ptr).unwrap();
        }
        docs
    }

    #[test]
    fn test_roundtrip_ascending_block() {
        let mut pool = pool(Direction::Ascending);
        let codec = BitPackCodec::new();
        let docs: Vec<DocId> = (0..BLOCK_SIZE as u32).map(|i| i * 7 + 3).collect();

        let ptr = pool.append_doc_ids(&codec, &docs, BlockPtr::NULL).unwrap();
        assert_eq!(decode_list(&pool, ptr), docs);
        assert_eq!(pool.bound(ptr).unwrap(), *docs.last().unwrap());
        assert!(pool.next_pointer(ptr).unwrap().is_null());
    }

    #[test]
    fn test_roundtrip_descending_single_batch() {
        let mut pool = pool(Direction::Descending);
        let codec = BitPackCodec::new();

        let head = pool.append_doc_ids(&codec, &[9, 5, 1], BlockPtr::NULL).unwrap();
        assert_eq!(decode_list(&pool, head), vec![9, 5, 1]);
        assert_eq!(pool.bound(head).unwrap(), 1);
    }

    #[test]
    fn test_descending_growth_links_new_head() {
        let mut pool = pool(Direction::Descending);
        let codec = BitPackCodec::new();

        let first = pool.append_doc_ids(&codec, &[5, 1], BlockPtr::NULL).unwrap();
        let head = pool.append_doc_ids(&codec, &[12, 9], first).unwrap();

        assert_eq!(pool.next_pointer(head).unwrap(), first);
        assert!(pool.next_pointer(first).unwrap().is_null());
        assert_eq!(decode_list(&pool, head), vec![12, 9, 5, 1]);

        // [4, 2] sits inside the current head's range
        assert!(pool.append_doc_ids(&codec, &[4, 2], head).is_err());
        assert!(pool.append_doc_ids(&codec, &[13, 12], head).is_err());
    }

    #[test]
    fn test_ascending_growth_links_new_tail() {
        let mut pool = pool(Direction::Ascending);
        let codec = BitPackCodec::new();

        let head = pool.append_doc_ids(&codec, &[1, 5], BlockPtr::NULL).unwrap();
        let tail = pool.append_doc_ids(&codec, &[9, 20], head).unwrap();

        assert_eq!(pool.next_pointer(head).unwrap(), tail);
        assert_eq!(decode_list(&pool, head), vec![1, 5, 9, 20]);
    }

    #[test]
    fn test_rejects_invalid_batches() {
        let mut pool = pool(Direction::Ascending);
        let codec = BitPackCodec::new();

        assert!(pool.append_doc_ids(&codec, &[], BlockPtr::NULL).is_err());
        assert!(pool.append_doc_ids(&codec, &[3, 3], BlockPtr::NULL).is_err());
        assert!(pool.append_doc_ids(&codec, &[4, 2], BlockPtr::NULL).is_err());
        let too_long: Vec<DocId> = (0..=BLOCK_SIZE as u32).collect();
        assert!(pool.append_doc_ids(&codec, &too_long, BlockPtr::NULL).is_err());
        assert!(pool
            .append_with_frequencies(&codec, &[1, 2], &[1], BlockPtr::NULL)
            .is_err());
        assert!(pool
            .append_positional(&codec, &[1, 2], &[1, 2], &[4, 5], BlockPtr::NULL)
            .is_err());

        let head = pool.append_doc_ids(&codec, &[10, 20], BlockPtr::NULL).unwrap();
        // Duplicate of the prior bound
        assert!(pool.append_doc_ids(&codec, &[20, 30], head).is_err());
        assert_eq!(pool.block_count(), 1);
    }

    #[test]
    fn test_frequencies_and_positions_ascending() {
        let mut pool = pool(Direction::Ascending);
        let codec = BitPackCodec::new();
        let docs = [2, 8, 15];
        let freqs = [2, 1, 3];
        let positions = [4, 9, 0, 1, 5, 30];

        let ptr = pool
            .append_positional(&codec, &docs, &freqs, &positions, BlockPtr::NULL)
            .unwrap();

        let mut buf = [0u32; BLOCK_SIZE];
        assert_eq!(pool.decompress_frequencies(&codec, ptr, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &freqs);

        assert_eq!(pool.decompress_positions(&codec, ptr).unwrap(), positions.to_vec());
        assert_eq!(
            pool.decompress_positions_for_document(&codec, ptr, 0).unwrap(),
            vec![4, 9]
        );
        assert_eq!(
            pool.decompress_positions_for_document(&codec, ptr, 2).unwrap(),
            vec![1, 5, 30]
        );
        assert!(pool.decompress_positions_for_document(&codec, ptr, 3).is_err());
    }

    #[test]
    fn test_frequencies_and_positions_descending() {
        let mut pool = pool(Direction::Descending);
        let codec = Lz4Codec::new();
        let docs = [15, 8, 2];
        let freqs = [3, 1, 2];
        let positions = [1, 5, 30, 0, 4, 9];

        let ptr = pool
            .append_positional(&codec, &docs, &freqs, &positions, BlockPtr::NULL)
            .unwrap();

        let mut buf = [0u32; BLOCK_SIZE];
        let n = pool.decompress_doc_ids(&codec, ptr, &mut buf).unwrap();
        assert_eq!(&buf[..n], &docs);
        pool.decompress_frequencies(&codec, ptr, &mut buf).unwrap();
        assert_eq!(&buf[..3], &freqs);

        assert_eq!(pool.decompress_positions(&codec, ptr).unwrap(), positions.to_vec());
        assert_eq!(
            pool.decompress_positions_for_document(&codec, ptr, 0).unwrap(),
            vec![1, 5, 30]
        );
        assert_eq!(
            pool.decompress_positions_for_document(&codec, ptr, 2).unwrap(),
            vec![4, 9]
        );
    }

    #[test]
    fn test_positions_span_sub_blocks() {
        let mut pool = pool(Direction::Ascending);
        let codec = BitPackCodec::new();
        let docs = [1, 2, 3];
        let freqs = [100, 100, 100];
        let positions: Vec<u32> = (0..3).flat_map(|d| (0..100).map(move |p| d * 1000 + p * 2)).collect();

        let ptr = pool
            .append_positional(&codec, &docs, &freqs, &positions, BlockPtr::NULL)
            .unwrap();

        let section_len = pool.block(ptr).unwrap().positions().unwrap().unwrap().sub_block_count();
        assert_eq!(section_len, 3);

        assert_eq!(pool.decompress_positions(&codec, ptr).unwrap(), positions);
        let second = pool.decompress_positions_for_document(&codec, ptr, 1).unwrap();
        assert_eq!(second, positions[100..200].to_vec());
    }

    #[test]
    fn test_missing_sections_are_reported() {
        let mut pool = pool(Direction::Ascending);
        let codec = BitPackCodec::new();
        let ptr = pool.append_doc_ids(&codec, &[1, 2], BlockPtr::NULL).unwrap();

        let mut buf = [0u32; BLOCK_SIZE];
        assert!(pool.decompress_frequencies(&codec, ptr, &mut buf).is_err());
        assert!(pool.decompress_positions(&codec, ptr).is_err());
    }

    #[test]
    fn test_blocks_never_straddle_segments() {
        let config = PoolConfig::default().with_segment_words(super::super::MIN_SEGMENT_WORDS);
        let mut pool = SegmentPool::new(config).unwrap();
        let codec = BitPackCodec::new();

        let mut prior = BlockPtr::NULL;
        let mut head = BlockPtr::NULL;
        let mut expected = Vec::new();
        for b in 0..20u32 {
            let docs: Vec<DocId> = (0..BLOCK_SIZE as u32).map(|i| b * 100_000 + i * 513).collect();
            prior = pool.append_doc_ids(&codec, &docs, prior).unwrap();
            if head.is_null() {
                head = prior;
            }
            expected.extend(docs);
        }

        assert!(pool.segment_count() > 1);
        assert_eq!(pool.block_count(), 20);
        for segment in &pool.segments {
            assert!(segment.len() <= config.segment_words);
        }
        assert_eq!(decode_list(&pool, head), expected);
    }

    #[test]
    fn test_block_too_large() {
        let config = PoolConfig::default().with_segment_words(super::super::MIN_SEGMENT_WORDS);
        let mut pool = SegmentPool::new(config).unwrap();
        let codec = BitPackCodec::new();
        let docs = [1u32];
        let freqs = [2000u32];
        let positions: Vec<u32> = (0..2000).map(|p| p * 1_000_003).collect();

        let err = pool
            .append_positional(&codec, &docs, &freqs, &positions, BlockPtr::NULL)
            .unwrap_err();
        assert!(matches!(err, SiftError::BlockTooLarge { .. }));
    }

    #[test]
    fn test_bound_ordering_across_blocks() {
        for direction in [Direction::Ascending, Direction::Descending] {
            let mut pool = pool(direction);
            let codec = BitPackCodec::new();
            let mut prior = BlockPtr::NULL;
            let mut first = BlockPtr::NULL;
            for b in 0..5u32 {
                let mut docs: Vec<DocId> = (0..10).map(|i| b * 100 + i * 3).collect();
                if direction.is_descending() {
                    docs.reverse();
                }
                prior = pool.append_doc_ids(&codec, &docs, prior).unwrap();
                if first.is_null() {
                    first = prior;
                }
            }

            let head = if direction.is_descending() { prior } else { first };
            let mut ptr = head;
            let mut bounds = Vec::new();
            while !ptr.is_null() {
                bounds.push(pool.bound(ptr).unwrap());
                ptr = pool.next_pointer(ptr).unwrap();
            }
            assert_eq!(bounds.len(), 5);
            assert!(bounds.windows(2).all(|w| direction.precedes(w[0], w[1])));
        }
    }

    #[test]
    fn test_next_pointer_to_skips_blocks() {
        let mut pool = pool(Direction::Ascending);
        let codec = BitPackCodec::new();
        let a = pool.append_doc_ids(&codec, &[1, 2, 3], BlockPtr::NULL).unwrap();
        let b = pool.append_doc_ids(&codec, &[10, 11], a).unwrap();
        let c = pool.append_doc_ids(&codec, &[20, 30], b).unwrap();

        assert_eq!(pool.next_pointer_to(a, 5).unwrap(), b);
        assert_eq!(pool.next_pointer_to(a, 12).unwrap(), c);
        assert_eq!(pool.next_pointer_to(a, 30).unwrap(), c);
        assert!(pool.next_pointer_to(a, 31).unwrap().is_null());
    }

    #[test]
    fn test_invalid_pointer() {
        let pool = pool(Direction::Ascending);
        assert!(matches!(
            pool.block(BlockPtr::new(0, 0)),
            Err(SiftError::InvalidPointer(_))
        ));
        assert!(pool.next_pointer(BlockPtr::NULL).is_err());
    }

    #[test]
    fn test_bloom_section_written() {
        let config = PoolConfig::default().with_bloom(BloomConfig::default());
        let mut pool = SegmentPool::new(config).unwrap();
        let codec = BitPackCodec::new();
        let ptr = pool.append_doc_ids(&codec, &[3, 6, 9], BlockPtr::NULL).unwrap();

        let block = pool.block(ptr).unwrap();
        let bloom = block.bloom(config.bloom.unwrap().hash_count).unwrap();
        assert!(bloom.may_contain(3) && bloom.may_contain(6) && bloom.may_contain(9));
    }

    #[test]
    fn test_reset() {
        let mut pool = pool(Direction::Ascending);
        let codec = BitPackCodec::new();
        pool.append_doc_ids(&codec, &[1], BlockPtr::NULL).unwrap();
        pool.reset();
        assert_eq!(pool.stats().blocks, 0);
        assert_eq!(pool.segment_count(), 0);
    }
}
