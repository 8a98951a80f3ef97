//! Error types for Sift

use thiserror::Error;

/// Result type alias for Sift operations
pub type Result<T> = std::result::Result<T, SiftError>;

/// Sift error types
#[derive(Error, Debug)]
pub enum SiftError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Data corruption detected
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Invalid snapshot format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Block codec could not decode its input
    #[error("Codec error: {0}")]
    Codec(String),

    /// Pointer does not address a block inside the pool
    #[error("Invalid block pointer: {0:#x}")]
    InvalidPointer(u64),

    /// Posting batch rejected at append time
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    /// Encoded block cannot fit in an empty segment
    #[error("Block of {words} words exceeds segment capacity of {capacity} words")]
    BlockTooLarge { words: usize, capacity: usize },

    /// Query arguments are inconsistent
    #[error("Query error: {0}")]
    Query(String),
}

impl SiftError {
    /// Check if error indicates corruption of stored words
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            SiftError::Corruption(_)
                | SiftError::ChecksumMismatch { .. }
                | SiftError::InvalidPointer(_)
                | SiftError::Codec(_)
        )
    }
}
