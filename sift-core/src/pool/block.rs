//! Block layout inside a segment
//!
//! ```text
//! word 0      total length in words (header included)
//! word 1..3   next-block pointer (low word, high word)
//! word 3      bound docID
//! word 4      section flags
//! word 5      logical posting count
//! word 6      docID payload length
//! word 7      frequency payload length
//! word 8      position section length
//! word 9      Bloom section length
//! payloads    docIDs | frequencies | positions | Bloom bits
//! ```
//!
//! The position section is `[total positions, sub-block count]` followed
//! by `[encoded length, encoded words...]` for every sub-block.

use super::bloom::BloomView;
use crate::compression::BLOCK_SIZE;
use crate::{BlockPtr, BlockShape, DocId, Result, SiftError};
use std::ops::Range;

/// Header size in words
pub const HEADER_WORDS: usize = 10;

const TOTAL_LEN: usize = 0;
const NEXT_LO: usize = 1;
const NEXT_HI: usize = 2;
const BOUND: usize = 3;
const FLAGS: usize = 4;
const COUNT: usize = 5;
const DOC_LEN: usize = 6;
const FREQ_LEN: usize = 7;
const POS_LEN: usize = 8;
const BLOOM_LEN: usize = 9;

const FLAG_FREQUENCIES: u32 = 1;
const FLAG_POSITIONS: u32 = 1 << 1;
const FLAG_BLOOM: u32 = 1 << 2;

/// Decoded block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Total block length in words
    pub total_words: u32,
    /// Next block in the chain
    pub next: BlockPtr,
    /// Last docID of the block in traversal order
    pub bound: DocId,
    /// Payload sections present
    pub shape: BlockShape,
    /// Block carries a Bloom filter
    pub has_bloom: bool,
    /// Number of postings
    pub count: u32,
    /// Encoded docID payload length
    pub doc_words: u32,
    /// Encoded frequency payload length
    pub freq_words: u32,
    /// Position section length
    pub position_words: u32,
    /// Bloom section length
    pub bloom_words: u32,
}

impl BlockHeader {
    /// Serialize into the first `HEADER_WORDS` words of `out`
    pub fn write(&self, out: &mut [u32]) {
        let mut flags = 0;
        if self.shape.has_frequencies() {
            flags |= FLAG_FREQUENCIES;
        }
        if self.shape.has_positions() {
            flags |= FLAG_POSITIONS;
        }
        if self.has_bloom {
            flags |= FLAG_BLOOM;
        }

        out[TOTAL_LEN] = self.total_words;
        write_pointer(out, self.next);
        out[BOUND] = self.bound;
        out[FLAGS] = flags;
        out[COUNT] = self.count;
        out[DOC_LEN] = self.doc_words;
        out[FREQ_LEN] = self.freq_words;
        out[POS_LEN] = self.position_words;
        out[BLOOM_LEN] = self.bloom_words;
    }

    /// Deserialize and validate a header
    pub fn read(words: &[u32]) -> Result<Self> {
        if words.len() < HEADER_WORDS {
            return Err(SiftError::Corruption("Block header too short".into()));
        }

        let flags = words[FLAGS];
        let shape = match (flags & FLAG_FREQUENCIES != 0, flags & FLAG_POSITIONS != 0) {
            (false, false) => BlockShape::DocIds,
            (true, false) => BlockShape::Frequencies,
            (true, true) => BlockShape::Positional,
            (false, true) => {
                return Err(SiftError::Corruption(
                    "positions without frequencies".into(),
                ))
            }
        };

        let header = Self {
            total_words: words[TOTAL_LEN],
            next: read_pointer(words),
            bound: words[BOUND],
            shape,
            has_bloom: flags & FLAG_BLOOM != 0,
            count: words[COUNT],
            doc_words: words[DOC_LEN],
            freq_words: words[FREQ_LEN],
            position_words: words[POS_LEN],
            bloom_words: words[BLOOM_LEN],
        };

        if header.count == 0 || header.count as usize > BLOCK_SIZE {
            return Err(SiftError::Corruption(format!(
                "block count {} out of range",
                header.count
            )));
        }

        let sections = HEADER_WORDS as u64
            + header.doc_words as u64
            + header.freq_words as u64
            + header.position_words as u64
            + header.bloom_words as u64;
        if sections != header.total_words as u64 {
            return Err(SiftError::Corruption(format!(
                "block sections sum to {} words, header says {}",
                sections, header.total_words
            )));
        }

        Ok(header)
    }

    /// Word range of the docID payload, relative to the block start
    pub fn doc_range(&self) -> Range<usize> {
        let start = HEADER_WORDS;
        start..start + self.doc_words as usize
    }

    /// Word range of the frequency payload
    pub fn freq_range(&self) -> Range<usize> {
        let start = self.doc_range().end;
        start..start + self.freq_words as usize
    }

    /// Word range of the position section
    pub fn position_range(&self) -> Range<usize> {
        let start = self.freq_range().end;
        start..start + self.position_words as usize
    }

    /// Word range of the Bloom bits
    pub fn bloom_range(&self) -> Range<usize> {
        let start = self.position_range().end;
        start..start + self.bloom_words as usize
    }
}

/// Overwrite the next pointer of a block stored at the start of `out`
pub(crate) fn write_pointer(out: &mut [u32], next: BlockPtr) {
    let raw = next.raw();
    out[NEXT_LO] = raw as u32;
    out[NEXT_HI] = (raw >> 32) as u32;
}

fn read_pointer(words: &[u32]) -> BlockPtr {
    BlockPtr::from_raw(words[NEXT_LO] as u64 | ((words[NEXT_HI] as u64) << 32))
}

/// Borrowed view of a stored block
#[derive(Debug, Clone, Copy)]
pub struct BlockRef<'a> {
    /// Parsed header
    pub header: BlockHeader,
    words: &'a [u32],
}

impl<'a> BlockRef<'a> {
    /// Parse a block starting at `words[0]`
    pub fn parse(words: &'a [u32]) -> Result<Self> {
        let header = BlockHeader::read(words)?;
        let total = header.total_words as usize;
        let words = words.get(..total).ok_or_else(|| {
            SiftError::Corruption(format!(
                "block of {} words runs past the end of its segment",
                total
            ))
        })?;
        Ok(Self { header, words })
    }

    /// Number of postings
    pub fn len(&self) -> usize {
        self.header.count as usize
    }

    /// Blocks always hold at least one posting
    pub fn is_empty(&self) -> bool {
        self.header.count == 0
    }

    /// Encoded docID payload
    pub fn doc_payload(&self) -> &'a [u32] {
        &self.words[self.header.doc_range()]
    }

    /// Encoded frequency payload, if present
    pub fn freq_payload(&self) -> Option<&'a [u32]> {
        self.header
            .shape
            .has_frequencies()
            .then(|| &self.words[self.header.freq_range()])
    }

    /// Position section, if present
    pub fn positions(&self) -> Result<Option<PositionSection<'a>>> {
        if !self.header.shape.has_positions() {
            return Ok(None);
        }
        PositionSection::parse(&self.words[self.header.position_range()]).map(Some)
    }

    /// Bloom filter over this block's docIDs, if present
    pub fn bloom(&self, num_hashes: u32) -> Option<BloomView<'a>> {
        self.header
            .has_bloom
            .then(|| BloomView::new(&self.words[self.header.bloom_range()], num_hashes))
    }
}

/// Position sub-blocks of one block
#[derive(Debug, Clone)]
pub struct PositionSection<'a> {
    /// Total number of positions across all documents of the block
    pub total: usize,
    sub_blocks: Vec<&'a [u32]>,
}

impl<'a> PositionSection<'a> {
    fn parse(words: &'a [u32]) -> Result<Self> {
        if words.len() < 2 {
            return Err(SiftError::Corruption("position section too short".into()));
        }
        let total = words[0] as usize;
        let count = words[1] as usize;
        if count != total.div_ceil(BLOCK_SIZE) {
            return Err(SiftError::Corruption(format!(
                "{} position sub-blocks cannot hold {} positions",
                count, total
            )));
        }

        let mut sub_blocks = Vec::with_capacity(count);
        let mut offset = 2;
        for _ in 0..count {
            let len = *words
                .get(offset)
                .ok_or_else(|| SiftError::Corruption("truncated position section".into()))?
                as usize;
            let payload = words
                .get(offset + 1..offset + 1 + len)
                .ok_or_else(|| SiftError::Corruption("truncated position sub-block".into()))?;
            sub_blocks.push(payload);
            offset += 1 + len;
        }

        Ok(Self { total, sub_blocks })
    }

    /// Encoded payload of sub-block `index`
    pub fn sub_block(&self, index: usize) -> Option<&'a [u32]> {
        self.sub_blocks.get(index).copied()
    }

    /// Number of sub-blocks
    pub fn sub_block_count(&self) -> usize {
        self.sub_blocks.len()
    }

    /// Logical length of sub-block `index`
    pub fn sub_block_len(&self, index: usize) -> usize {
        let start = index * BLOCK_SIZE;
        self.total.saturating_sub(start).min(BLOCK_SIZE)
    }
}
