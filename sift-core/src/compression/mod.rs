//! Block codecs for posting payloads
//!
//! A codec turns exactly `BLOCK_SIZE` integers into a run of `u32` words
//! and back. Blocks shorter than `BLOCK_SIZE` are zero-padded before
//! encoding, so codecs must round-trip padded tails losslessly.

mod bitpack;
mod bitstream;
mod lz4;

pub use bitpack::{bits_needed, BitPackCodec};
pub use bitstream::{BitReader, BitWriter};
pub use lz4::Lz4Codec;

use crate::Result;
use serde::{Deserialize, Serialize};

/// Number of postings per block
pub const BLOCK_SIZE: usize = 128;

/// Encoder/decoder for one fixed-size integer block
pub trait BlockCodec: Send + Sync {
    /// Short identifier used in logs and statistics
    fn name(&self) -> &'static str;

    /// Append the encoded form of `values` to `out`
    fn encode(&self, values: &[u32; BLOCK_SIZE], out: &mut Vec<u32>);

    /// Decode words produced by [`BlockCodec::encode`]
    fn decode(&self, input: &[u32], output: &mut [u32; BLOCK_SIZE]) -> Result<()>;
}

/// Codec selection for tools and configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// [`BitPackCodec`]
    #[default]
    BitPack,
    /// [`Lz4Codec`]
    Lz4,
}

impl CodecKind {
    /// Instantiate the codec
    pub fn codec(self) -> Box<dyn BlockCodec> {
        match self {
            CodecKind::BitPack => Box::new(BitPackCodec::new()),
            CodecKind::Lz4 => Box::new(Lz4Codec::new()),
        }
    }
}

/// Replace strictly increasing values by their successive differences.
/// The first value is kept as is.
pub fn delta_encode(values: &mut [u32]) {
    for i in (1..values.len()).rev() {
        values[i] = values[i].wrapping_sub(values[i - 1]);
    }
}

/// Inverse of [`delta_encode`]
pub fn prefix_sum(values: &mut [u32]) {
    for i in 1..values.len() {
        values[i] = values[i].wrapping_add(values[i - 1]);
    }
}

/// Copy `values` into a zero-padded block
pub(crate) fn padded_block(values: &[u32]) -> [u32; BLOCK_SIZE] {
    let mut block = [0u32; BLOCK_SIZE];
    block[..values.len()].copy_from_slice(values);
    block
}
