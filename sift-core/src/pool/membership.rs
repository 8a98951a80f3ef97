//! DocID membership tests against a posting list

use super::SegmentPool;
use crate::compression::{BlockCodec, BLOCK_SIZE};
use crate::{BlockPtr, DocId, Result};

/// Forward-only position in one posting list for repeated membership tests.
///
/// Probes must arrive in traversal order; the cursor never moves back
/// towards the head.
#[derive(Debug, Clone)]
pub struct MembershipCursor {
    ptr: BlockPtr,
    exact: bool,
    decoded: BlockPtr,
    len: usize,
    buf: Box<[u32; BLOCK_SIZE]>,
}

impl MembershipCursor {
    /// Bloom-only cursor. Blocks with a filter answer from the filter alone
    /// and may report false positives.
    pub fn bloom(head: BlockPtr) -> Self {
        Self::new(head, false)
    }

    /// Exact cursor. A Bloom hit is confirmed against the decoded block.
    pub fn exact(head: BlockPtr) -> Self {
        Self::new(head, true)
    }

    fn new(head: BlockPtr, exact: bool) -> Self {
        Self {
            ptr: head,
            exact,
            decoded: BlockPtr::NULL,
            len: 0,
            buf: Box::new([0u32; BLOCK_SIZE]),
        }
    }

    /// Block the cursor currently sits on
    pub fn block(&self) -> BlockPtr {
        self.ptr
    }
}

impl SegmentPool {
    /// Test whether `doc` belongs to the list the cursor walks.
    ///
    /// The cursor first skips to the block whose range may hold `doc`. That
    /// block's Bloom filter rejects most absent docIDs without decoding;
    /// blocks without a filter are always checked exactly.
    pub fn contains_doc_id(
        &self,
        codec: &dyn BlockCodec,
        doc: DocId,
        cursor: &mut MembershipCursor,
    ) -> Result<bool> {
        let direction = self.config.direction;

        while !cursor.ptr.is_null() {
            let header = self.header(cursor.ptr)?;
            if header.bound == doc {
                return Ok(true);
            }
            if !direction.precedes(header.bound, doc) {
                break;
            }
            cursor.ptr = header.next;
        }
        if cursor.ptr.is_null() {
            return Ok(false);
        }

        let block = self.block(cursor.ptr)?;
        if let Some(bloom) = self.config.bloom.and_then(|cfg| block.bloom(cfg.hash_count)) {
            if !bloom.may_contain(doc) {
                return Ok(false);
            }
            if !cursor.exact {
                return Ok(true);
            }
        }

        if cursor.decoded != cursor.ptr {
            cursor.len = self.decompress_doc_ids(codec, cursor.ptr, &mut cursor.buf)?;
            cursor.decoded = cursor.ptr;
        }
        Ok(cursor.buf[..cursor.len]
            .binary_search_by(|probe| direction.compare(*probe, doc))
            .is_ok())
    }
}
