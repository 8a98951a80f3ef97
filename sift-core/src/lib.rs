//! Sift Core - Block-Compressed Posting Lists and Query Algorithms
//!
//! The storage and query core of a full-text search engine:
//! - Posting lists stored as chains of fixed-size compressed blocks
//! - Append-only segment pool with relocatable `(segment, offset)` handles
//! - Ascending and descending lists served by one code path
//!
//! # Architecture
//!
//! - **Compression**: delta encoding plus a pluggable block codec
//! - **Pool**: segments, block headers, per-block Bloom filters, snapshots
//! - **Query**: galloping SvS intersection, BWAND AND/OR and WAND top-k

pub mod compression;
pub mod pool;
pub mod query;

mod error;
mod types;

pub use error::{Result, SiftError};
pub use types::*;

/// Sift version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod config {
    /// Segment capacity in words (4MB)
    pub const DEFAULT_SEGMENT_WORDS: usize = 1 << 20;

    /// Largest accepted segment capacity in words (256MB)
    pub const MAX_SEGMENT_WORDS: usize = 1 << 26;

    /// Bloom filter bits per docID
    pub const BLOOM_BITS_PER_ELEMENT: u32 = 10;

    /// Bloom filter hash probes
    pub const BLOOM_HASH_COUNT: u32 = 7;

    /// BM25 term frequency saturation
    pub const BM25_K1: f32 = 1.2;

    /// BM25 length normalization
    pub const BM25_B: f32 = 0.75;
}
