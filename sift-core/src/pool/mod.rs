//! Segment pool: append-only storage for block-compressed posting lists
//!
//! Storage is an ordered list of fixed-capacity word segments filled
//! front to back. Every block is self-describing and belongs to exactly one
//! posting list through its next-block pointer. The pool does not know
//! which lists exist; callers keep the head pointer of every list.
//!
//! - Blocks are immutable once written and never straddle two segments
//! - Ascending lists grow at the tail, descending lists grow at the head
//! - Optional per-block Bloom filters for cheap negative membership tests

mod block;
mod bloom;
mod builder;
mod membership;
mod segment_pool;
mod snapshot;

pub use block::{BlockHeader, BlockRef, PositionSection, HEADER_WORDS};
pub use bloom::{optimal_hashes, required_words, BloomFilter, BloomView};
pub use builder::{ListBuilder, ListHandle};
pub use membership::MembershipCursor;
pub use segment_pool::{PostingBatch, SegmentPool};

use crate::config::MAX_SEGMENT_WORDS;
use crate::{Direction, Result, SiftError};
use serde::{Deserialize, Serialize};

/// Smallest accepted segment capacity in words
pub const MIN_SEGMENT_WORDS: usize = 256;

/// Per-block Bloom filter parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomConfig {
    /// Number of hash probes per key
    pub hash_count: u32,
    /// Filter bits per docID
    pub bits_per_element: u32,
}

impl BloomConfig {
    /// Configuration with the optimal probe count for a bit budget
    pub fn with_bits_per_element(bits_per_element: u32) -> Self {
        Self {
            hash_count: optimal_hashes(bits_per_element as usize),
            bits_per_element,
        }
    }
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            hash_count: crate::config::BLOOM_HASH_COUNT,
            bits_per_element: crate::config::BLOOM_BITS_PER_ELEMENT,
        }
    }
}

/// Segment pool configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Capacity of every segment in words
    pub segment_words: usize,
    /// Traversal order of all lists in the pool
    pub direction: Direction,
    /// Bloom filters for every block, if enabled
    pub bloom: Option<BloomConfig>,
}

impl PoolConfig {
    /// Set the list direction
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Enable per-block Bloom filters
    pub fn with_bloom(mut self, bloom: BloomConfig) -> Self {
        self.bloom = Some(bloom);
        self
    }

    /// Set the segment capacity
    pub fn with_segment_words(mut self, segment_words: usize) -> Self {
        self.segment_words = segment_words;
        self
    }

    /// Check the configuration for values the pool cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.segment_words < MIN_SEGMENT_WORDS || self.segment_words > MAX_SEGMENT_WORDS {
            return Err(SiftError::InvalidFormat(format!(
                "segment size {} words outside [{}, {}]",
                self.segment_words, MIN_SEGMENT_WORDS, MAX_SEGMENT_WORDS
            )));
        }
        if let Some(bloom) = self.bloom {
            if bloom.hash_count == 0 || bloom.bits_per_element == 0 {
                return Err(SiftError::InvalidFormat(
                    "bloom filter needs at least one hash and one bit per element".into(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            segment_words: crate::config::DEFAULT_SEGMENT_WORDS,
            direction: Direction::Ascending,
            bloom: None,
        }
    }
}

/// Pool statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Number of allocated segments
    pub segments: usize,
    /// Number of blocks written
    pub blocks: usize,
    /// Words occupied by blocks
    pub words_used: usize,
    /// Words allocated across all segments
    pub words_allocated: usize,
}
