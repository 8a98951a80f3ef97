//! LZ4 block codec
//!
//! Serializes the block little-endian and compresses it with LZ4. Slower
//! to decode than bit packing but tolerant of irregular gaps.

use super::{BlockCodec, BLOCK_SIZE};
use crate::{Result, SiftError};

/// LZ4 codec. Layout: `[byte_len, compressed bytes padded to whole words...]`
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec;

impl Lz4Codec {
    /// Create a new codec
    pub fn new() -> Self {
        Self
    }
}

impl BlockCodec for Lz4Codec {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn encode(&self, values: &[u32; BLOCK_SIZE], out: &mut Vec<u32>) {
        let mut raw = Vec::with_capacity(BLOCK_SIZE * 4);
        for value in values {
            raw.extend_from_slice(&value.to_le_bytes());
        }

        let compressed = lz4_flex::compress_prepend_size(&raw);
        out.push(compressed.len() as u32);
        for chunk in compressed.chunks(4) {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            out.push(u32::from_le_bytes(word));
        }
    }

    fn decode(&self, input: &[u32], output: &mut [u32; BLOCK_SIZE]) -> Result<()> {
        let (&byte_len, words) = input
            .split_first()
            .ok_or_else(|| SiftError::Codec("empty lz4 block".into()))?;

        let byte_len = byte_len as usize;
        if words.len() < byte_len.div_ceil(4) {
            return Err(SiftError::Codec("truncated lz4 block".into()));
        }

        let mut compressed = Vec::with_capacity(byte_len + 4);
        for word in words {
            compressed.extend_from_slice(&word.to_le_bytes());
        }
        compressed.truncate(byte_len);

        let raw = lz4_flex::decompress_size_prepended(&compressed)
            .map_err(|e| SiftError::Codec(e.to_string()))?;
        if raw.len() != BLOCK_SIZE * 4 {
            return Err(SiftError::Codec(format!(
                "lz4 block decoded to {} bytes, expected {}",
                raw.len(),
                BLOCK_SIZE * 4
            )));
        }

        for (out, bytes) in output.iter_mut().zip(raw.chunks_exact(4)) {
            *out = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lz4_roundtrip() {
        let codec = Lz4Codec::new();
        let mut values = [0u32; BLOCK_SIZE];
        for (i, v) in values.iter_mut().take(100).enumerate() {
            *v = (i as u32 * 7919) % 1000;
        }

        let mut encoded = Vec::new();
        codec.encode(&values, &mut encoded);

        let mut decoded = [0u32; BLOCK_SIZE];
        codec.decode(&encoded, &mut decoded).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_lz4_compresses_padding() {
        let codec = Lz4Codec::new();
        let mut values = [0u32; BLOCK_SIZE];
        values[0] = 42;

        let mut encoded = Vec::new();
        codec.encode(&values, &mut encoded);
        assert!(encoded.len() < BLOCK_SIZE / 2);
    }

    #[test]
    fn test_lz4_rejects_garbage() {
        let codec = Lz4Codec::new();
        let mut decoded = [0u32; BLOCK_SIZE];
        assert!(codec.decode(&[], &mut decoded).is_err());
        assert!(codec.decode(&[64, 1, 2], &mut decoded).is_err());
    }
}
