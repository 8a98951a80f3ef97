//! Decoded-block cursor over one posting list

use crate::compression::{BlockCodec, BLOCK_SIZE};
use crate::pool::SegmentPool;
use crate::{BlockPtr, DocId, Direction, Result};

/// Position inside one posting list, holding its current block decoded.
///
/// Once the chain is exhausted the cursor sits on `BlockPtr::NULL` and
/// [`BlockCursor::doc`] returns `None`.
pub struct BlockCursor<'a> {
    pool: &'a SegmentPool,
    codec: &'a dyn BlockCodec,
    direction: Direction,
    with_frequencies: bool,
    ptr: BlockPtr,
    docs: [DocId; BLOCK_SIZE],
    frequencies: [u32; BLOCK_SIZE],
    len: usize,
    index: usize,
}

impl<'a> BlockCursor<'a> {
    /// Open a cursor on the first posting of the list starting at `head`.
    /// A null head yields an exhausted cursor.
    pub fn open(
        pool: &'a SegmentPool,
        codec: &'a dyn BlockCodec,
        head: BlockPtr,
        with_frequencies: bool,
    ) -> Result<Self> {
        let mut cursor = Self {
            pool,
            codec,
            direction: pool.direction(),
            with_frequencies,
            ptr: BlockPtr::NULL,
            docs: [0; BLOCK_SIZE],
            frequencies: [1; BLOCK_SIZE],
            len: 0,
            index: 0,
        };
        cursor.load(head)?;
        Ok(cursor)
    }

    fn load(&mut self, ptr: BlockPtr) -> Result<()> {
        self.ptr = ptr;
        self.index = 0;
        if ptr.is_null() {
            self.len = 0;
            return Ok(());
        }

        self.len = self.pool.decompress_doc_ids(self.codec, ptr, &mut self.docs)?;
        if self.with_frequencies {
            let has_frequencies = self.pool.header(ptr)?.shape.has_frequencies();
            if has_frequencies {
                self.pool
                    .decompress_frequencies(self.codec, ptr, &mut self.frequencies)?;
            } else {
                self.frequencies[..self.len].fill(1);
            }
        }
        Ok(())
    }

    /// Current docID, or `None` once the list is exhausted
    #[inline]
    pub fn doc(&self) -> Option<DocId> {
        (self.index < self.len).then(|| self.docs[self.index])
    }

    /// Term frequency of the current posting (1 without frequencies)
    #[inline]
    pub fn frequency(&self) -> u32 {
        if self.with_frequencies && self.index < self.len {
            self.frequencies[self.index]
        } else {
            1
        }
    }

    /// Block the cursor sits on
    pub fn block(&self) -> BlockPtr {
        self.ptr
    }

    /// The list has no further postings
    pub fn is_exhausted(&self) -> bool {
        self.ptr.is_null()
    }

    /// Move to the next posting, decoding the next block when the current
    /// one runs out. Returns false once the list is exhausted.
    pub fn advance(&mut self) -> Result<bool> {
        if self.ptr.is_null() {
            return Ok(false);
        }
        self.index += 1;
        if self.index < self.len {
            return Ok(true);
        }
        let next = self.pool.next_pointer(self.ptr)?;
        self.load(next)?;
        Ok(!self.ptr.is_null())
    }

    /// Move forward to the first posting that does not precede `pivot`.
    ///
    /// Whole blocks whose bound precedes `pivot` are skipped through their
    /// headers; inside a block the target is bracketed by exponential
    /// probing from the current index and then binary searched. Returns
    /// false when no such posting exists, leaving the cursor exhausted.
    pub fn gallop_search(&mut self, pivot: DocId) -> Result<bool> {
        if self.ptr.is_null() {
            return Ok(false);
        }

        let direction = self.direction;
        if direction.precedes(self.docs[self.len - 1], pivot) {
            let next = self.pool.next_pointer_to(self.ptr, pivot)?;
            self.load(next)?;
            if self.ptr.is_null() {
                return Ok(false);
            }
        }

        let docs = &self.docs[..self.len];
        let mut lo = self.index;
        let mut hi = self.index;
        let mut step = 1;
        while hi < docs.len() && direction.precedes(docs[hi], pivot) {
            lo = hi + 1;
            hi = self.index + step;
            step *= 2;
        }
        let hi = hi.min(docs.len());

        self.index = lo + docs[lo..hi].partition_point(|&doc| direction.precedes(doc, pivot));
        Ok(true)
    }
}
