//! Core types for Sift

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Document identifier
pub type DocId = u32;

/// Relevance score
pub type Score = f32;

/// Traversal order of every posting list in a pool.
///
/// All docID comparisons in the pool and the query layer go through this
/// type, so one algorithm body serves both ascending and descending lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Lists are walked from the smallest docID to the largest
    #[default]
    Ascending,
    /// Lists are walked from the largest docID to the smallest
    Descending,
}

impl Direction {
    /// Three-way compare in traversal order
    #[inline]
    pub fn compare(self, a: DocId, b: DocId) -> Ordering {
        match self {
            Direction::Ascending => a.cmp(&b),
            Direction::Descending => b.cmp(&a),
        }
    }

    /// `a` is visited strictly before `b`
    #[inline]
    pub fn precedes(self, a: DocId, b: DocId) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    /// `a` is visited before `b` or is `b`
    #[inline]
    pub fn precedes_or_eq(self, a: DocId, b: DocId) -> bool {
        self.compare(a, b) != Ordering::Greater
    }

    /// Persisted flag value
    pub fn as_flag(self) -> u32 {
        match self {
            Direction::Ascending => 0,
            Direction::Descending => 1,
        }
    }

    /// Decode a persisted flag value
    pub fn from_flag(flag: u32) -> Option<Self> {
        match flag {
            0 => Some(Direction::Ascending),
            1 => Some(Direction::Descending),
            _ => None,
        }
    }

    /// Check if the list is walked in decreasing docID order
    pub fn is_descending(self) -> bool {
        self == Direction::Descending
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ascending => write!(f, "ascending"),
            Direction::Descending => write!(f, "descending"),
        }
    }
}

/// Handle of a block inside a segment pool.
///
/// Packs `(segment index, word offset)` into one integer so it can be
/// compared, stored inside block headers and persisted as a list head.
/// A pointer does not own anything and is only meaningful for the pool
/// that produced it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockPtr(u64);

impl BlockPtr {
    /// Sentinel meaning "no such block"
    pub const NULL: BlockPtr = BlockPtr(u64::MAX);

    /// Build a pointer from its parts
    #[inline]
    pub fn new(segment: u32, offset: u32) -> Self {
        BlockPtr(((segment as u64) << 32) | offset as u64)
    }

    /// Wrap a raw persisted value
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        BlockPtr(raw)
    }

    /// Raw persisted value
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Segment index
    #[inline]
    pub fn segment(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Word offset inside the segment
    #[inline]
    pub fn offset(self) -> u32 {
        self.0 as u32
    }

    /// Check for the sentinel
    #[inline]
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

impl Default for BlockPtr {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for BlockPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "BlockPtr(NULL)")
        } else {
            write!(f, "BlockPtr({}:{})", self.segment(), self.offset())
        }
    }
}

impl fmt::Display for BlockPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Payload sections carried by a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockShape {
    /// DocIDs only
    DocIds,
    /// DocIDs and term frequencies
    Frequencies,
    /// DocIDs, term frequencies and positions
    Positional,
}

impl BlockShape {
    /// Block stores a frequency payload
    pub fn has_frequencies(self) -> bool {
        !matches!(self, BlockShape::DocIds)
    }

    /// Block stores a position section
    pub fn has_positions(self) -> bool {
        matches!(self, BlockShape::Positional)
    }
}

/// A document together with its score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    /// Document identifier
    pub doc_id: DocId,
    /// Score (an upper bound for BWAND OR, BM25 for WAND)
    pub score: Score,
}

impl ScoredDoc {
    /// Create a new scored document
    pub fn new(doc_id: DocId, score: Score) -> Self {
        Self { doc_id, score }
    }
}
