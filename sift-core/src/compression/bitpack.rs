//! Fixed-width bit packing codec
//!
//! Every block is packed with the width of its largest value. Deltas of
//! dense posting lists are small, so most blocks need only a few bits per
//! value.

use super::bitstream::{BitReader, BitWriter};
use super::{BlockCodec, BLOCK_SIZE};
use crate::{Result, SiftError};

/// Compute the number of bits needed to represent the maximum value
#[inline]
pub fn bits_needed(max_val: u32) -> u32 {
    32 - max_val.leading_zeros()
}

/// Frame-of-reference bit packing over `BLOCK_SIZE` values.
///
/// Layout: `[bit_width, packed words...]`, `BLOCK_SIZE * bit_width / 32`
/// packed words.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitPackCodec;

impl BitPackCodec {
    /// Create a new codec
    pub fn new() -> Self {
        Self
    }

    /// Encoded size in words for a given bit width
    pub fn encoded_words(bit_width: u32) -> usize {
        1 + (BLOCK_SIZE * bit_width as usize).div_ceil(32)
    }
}

impl BlockCodec for BitPackCodec {
    fn name(&self) -> &'static str {
        "bitpack"
    }

    fn encode(&self, values: &[u32; BLOCK_SIZE], out: &mut Vec<u32>) {
        let max = values.iter().copied().max().unwrap_or(0);
        let bit_width = bits_needed(max);

        out.push(bit_width);
        if bit_width == 0 {
            return;
        }

        let mut writer = BitWriter::with_capacity(Self::encoded_words(bit_width));
        for &value in values {
            writer.write_bits(value, bit_width);
        }
        out.extend_from_slice(&writer.finish());
    }

    fn decode(&self, input: &[u32], output: &mut [u32; BLOCK_SIZE]) -> Result<()> {
        let (&bit_width, packed) = input
            .split_first()
            .ok_or_else(|| SiftError::Codec("empty bitpacked block".into()))?;

        if bit_width > 32 {
            return Err(SiftError::Codec(format!("invalid bit width {}", bit_width)));
        }
        if bit_width == 0 {
            output.fill(0);
            return Ok(());
        }

        let mut reader = BitReader::new(packed);
        for out in output.iter_mut() {
            *out = reader
                .read_bits(bit_width)
                .ok_or_else(|| SiftError::Codec("truncated bitpacked block".into()))?;
        }
        Ok(())
    }
}
