//! Pool snapshots
//!
//! File format (all integers little-endian `u32`):
//! ```text
//! +--------------------------------------------------------------+
//! | Header: magic "SIFT", block size, segment words,             |
//! |   segment count, current segment, current offset,            |
//! |   direction, bloom enabled, hash count, bits per element     |
//! +--------------------------------------------------------------+
//! | Closed segments, each exactly `segment words` long           |
//! +--------------------------------------------------------------+
//! | Used words of the active segment                             |
//! +--------------------------------------------------------------+
//! | CRC32 over everything above                                  |
//! +--------------------------------------------------------------+
//! ```

use super::block::BlockRef;
use super::{BloomConfig, PoolConfig, SegmentPool};
use crate::compression::BLOCK_SIZE;
use crate::{Direction, Result, SiftError};
use bytes::{Buf, BufMut, BytesMut};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::info;

const MAGIC: &[u8; 4] = b"SIFT";
const HEADER_BYTES: usize = 10 * 4;
const CHECKSUM_BYTES: usize = 4;

impl SegmentPool {
    /// Serialize the pool to `writer`
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let segment_words = self.config.segment_words;
        let body_words = self.segments.len().saturating_sub(1) * segment_words
            + self.segments.last().map_or(0, Vec::len);
        let mut buf = BytesMut::with_capacity(HEADER_BYTES + body_words * 4 + CHECKSUM_BYTES);

        let (current_segment, current_offset) = match self.segments.last() {
            Some(active) => (self.segments.len() - 1, active.len()),
            None => (0, 0),
        };
        let bloom = self.config.bloom;

        buf.put_slice(MAGIC);
        buf.put_u32_le(BLOCK_SIZE as u32);
        buf.put_u32_le(segment_words as u32);
        buf.put_u32_le(self.segments.len() as u32);
        buf.put_u32_le(current_segment as u32);
        buf.put_u32_le(current_offset as u32);
        buf.put_u32_le(self.config.direction.as_flag());
        buf.put_u32_le(bloom.is_some() as u32);
        buf.put_u32_le(bloom.map_or(0, |b| b.hash_count));
        buf.put_u32_le(bloom.map_or(0, |b| b.bits_per_element));

        for (index, segment) in self.segments.iter().enumerate() {
            for &word in segment {
                buf.put_u32_le(word);
            }
            if index != current_segment {
                buf.put_bytes(0, (segment_words - segment.len()) * 4);
            }
        }

        let checksum = crc32fast::hash(&buf);
        buf.put_u32_le(checksum);

        writer.write_all(&buf)?;
        writer.flush()?;
        Ok(())
    }

    /// Deserialize a pool written by [`SegmentPool::write_to`]
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        if data.len() < HEADER_BYTES + CHECKSUM_BYTES {
            return Err(SiftError::InvalidFormat("snapshot too short".into()));
        }
        if &data[..4] != MAGIC {
            return Err(SiftError::InvalidFormat("invalid snapshot magic".into()));
        }

        let (content, mut trailer) = data.split_at(data.len() - CHECKSUM_BYTES);
        let expected = trailer.get_u32_le();
        let actual = crc32fast::hash(content);
        if expected != actual {
            return Err(SiftError::ChecksumMismatch { expected, actual });
        }

        let mut cursor = &content[4..];
        let block_size = cursor.get_u32_le() as usize;
        if block_size != BLOCK_SIZE {
            return Err(SiftError::InvalidFormat(format!(
                "snapshot block size {} differs from {}",
                block_size, BLOCK_SIZE
            )));
        }
        let segment_words = cursor.get_u32_le() as usize;
        let segment_count = cursor.get_u32_le() as usize;
        let current_segment = cursor.get_u32_le() as usize;
        let current_offset = cursor.get_u32_le() as usize;
        let direction = Direction::from_flag(cursor.get_u32_le()).ok_or_else(|| {
            SiftError::InvalidFormat("unknown list direction".into())
        })?;
        let bloom_enabled = cursor.get_u32_le();
        let hash_count = cursor.get_u32_le();
        let bits_per_element = cursor.get_u32_le();

        let config = PoolConfig {
            segment_words,
            direction,
            bloom: match bloom_enabled {
                0 => None,
                1 => Some(BloomConfig {
                    hash_count,
                    bits_per_element,
                }),
                other => {
                    return Err(SiftError::InvalidFormat(format!(
                        "invalid bloom flag {}",
                        other
                    )))
                }
            },
        };
        config.validate()?;

        let expected_segment = segment_count.saturating_sub(1);
        if current_segment != expected_segment
            || current_offset > segment_words
            || (segment_count == 0 && current_offset != 0)
        {
            return Err(SiftError::Corruption(format!(
                "active segment {}:{} inconsistent with {} segments",
                current_segment, current_offset, segment_count
            )));
        }

        let body_words = expected_segment as u64 * segment_words as u64
            + if segment_count == 0 { 0 } else { current_offset as u64 };
        if cursor.remaining() as u64 != body_words * 4 {
            return Err(SiftError::Corruption(format!(
                "snapshot body holds {} bytes, header describes {}",
                cursor.remaining(),
                body_words * 4
            )));
        }

        let mut segments = Vec::with_capacity(segment_count);
        let mut blocks = 0;
        for index in 0..segment_count {
            let len = if index == current_segment {
                current_offset
            } else {
                segment_words
            };
            let mut words = Vec::with_capacity(len);
            for _ in 0..len {
                words.push(cursor.get_u32_le());
            }

            let used = walk_blocks(&words, &mut blocks)?;
            if index == current_segment && used != words.len() {
                return Err(SiftError::Corruption(format!(
                    "active segment ends mid-block at word {}",
                    used
                )));
            }
            words.truncate(used);
            segments.push(words);
        }

        Ok(Self {
            config,
            segments,
            blocks,
        })
    }

    /// Write a snapshot file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.get_ref().sync_all()?;

        info!(
            path = %path.display(),
            segments = self.segments.len(),
            blocks = self.blocks,
            "Saved pool snapshot"
        );
        Ok(())
    }

    /// Load a snapshot file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let pool = Self::read_from(&mut reader)?;

        info!(
            path = %path.display(),
            segments = pool.segments.len(),
            blocks = pool.blocks,
            direction = %pool.config.direction,
            "Loaded pool snapshot"
        );
        Ok(pool)
    }
}

/// Validate consecutive block headers from the start of a segment.
/// Returns the number of words covered by blocks; a zero length word
/// marks the zero padding after the last block.
fn walk_blocks(words: &[u32], blocks: &mut usize) -> Result<usize> {
    let mut offset = 0;
    while offset < words.len() {
        if words[offset] == 0 {
            if words[offset..].iter().any(|&w| w != 0) {
                return Err(SiftError::Corruption(format!(
                    "non-zero data after segment padding at word {}",
                    offset
                )));
            }
            break;
        }
        let block = BlockRef::parse(&words[offset..])?;
        offset += block.header.total_words as usize;
        *blocks += 1;
    }
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::BitPackCodec;
    use crate::pool::{ListBuilder, MIN_SEGMENT_WORDS};
    use crate::{BlockPtr, DocId};
    use tempfile::TempDir;

    fn sample_pool(direction: Direction) -> (SegmentPool, BlockPtr, Vec<DocId>) {
        let config = PoolConfig::default()
            .with_direction(direction)
            .with_segment_words(MIN_SEGMENT_WORDS)
            .with_bloom(BloomConfig::default());
        let mut pool = SegmentPool::new(config).unwrap();
        let codec = BitPackCodec::new();

        let mut docs: Vec<DocId> = (0..700).map(|i| i * 11 + 4).collect();
        if direction.is_descending() {
            docs.reverse();
        }
        let handle = ListBuilder::new(&mut pool, &codec).doc_ids(&docs).unwrap();
        (pool, handle.head, docs)
    }

    fn decode(pool: &SegmentPool, head: BlockPtr) -> Vec<DocId> {
        let codec = BitPackCodec::new();
        let mut out = Vec::new();
        let mut buf = [0u32; BLOCK_SIZE];
        let mut ptr = head;
        while !ptr.is_null() {
            let n = pool.decompress_doc_ids(&codec, ptr, &mut buf).unwrap();
            out.extend_from_slice(&buf[..n]);
            ptr = pool.next_pointer(ptr).unwrap();
        }
        out
    }

    #[test]
    fn test_snapshot_roundtrip() {
        for direction in [Direction::Ascending, Direction::Descending] {
            let (pool, head, docs) = sample_pool(direction);
            assert!(pool.segment_count() > 1);

            let mut bytes = Vec::new();
            pool.write_to(&mut bytes).unwrap();
            let restored = SegmentPool::read_from(&mut bytes.as_slice()).unwrap();

            assert_eq!(restored.config(), pool.config());
            assert_eq!(restored.stats(), pool.stats());
            assert_eq!(decode(&restored, head), docs);
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pool.sift");
        let (pool, head, docs) = sample_pool(Direction::Ascending);

        pool.save(&path).unwrap();
        let restored = SegmentPool::load(&path).unwrap();
        assert_eq!(decode(&restored, head), docs);
    }

    #[test]
    fn test_empty_pool_roundtrip() {
        let pool = SegmentPool::new(PoolConfig::default()).unwrap();
        let mut bytes = Vec::new();
        pool.write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len(), HEADER_BYTES + CHECKSUM_BYTES);

        let restored = SegmentPool::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(restored.segment_count(), 0);
        assert_eq!(restored.block_count(), 0);
    }

    #[test]
    fn test_detects_corruption() {
        let (pool, _, _) = sample_pool(Direction::Ascending);
        let mut bytes = Vec::new();
        pool.write_to(&mut bytes).unwrap();

        let mut flipped = bytes.clone();
        flipped[HEADER_BYTES + 20] ^= 0x40;
        assert!(matches!(
            SegmentPool::read_from(&mut flipped.as_slice()),
            Err(SiftError::ChecksumMismatch { .. })
        ));

        let truncated = &bytes[..bytes.len() - 9];
        assert!(SegmentPool::read_from(&mut &truncated[..]).is_err());

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(matches!(
            SegmentPool::read_from(&mut bad_magic.as_slice()),
            Err(SiftError::InvalidFormat(_))
        ));
    }

    fn sealed(header: [u32; 9]) -> Vec<u8> {
        let mut bytes = MAGIC.to_vec();
        for word in header {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        let checksum = crc32fast::hash(&bytes);
        bytes.extend_from_slice(&checksum.to_le_bytes());
        bytes
    }

    #[test]
    fn test_rejects_oversized_segments() {
        let bytes = sealed([BLOCK_SIZE as u32, u32::MAX, 1, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(
            SegmentPool::read_from(&mut bytes.as_slice()),
            Err(SiftError::InvalidFormat(_))
        ));

        let config =
            PoolConfig::default().with_segment_words(crate::config::MAX_SEGMENT_WORDS + 1);
        assert!(SegmentPool::new(config).is_err());
    }

    #[test]
    fn test_empty_active_segment_at_largest_size() {
        let largest = crate::config::MAX_SEGMENT_WORDS as u32;
        let bytes = sealed([BLOCK_SIZE as u32, largest, 1, 0, 0, 0, 0, 0, 0]);
        let restored = SegmentPool::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(restored.segment_count(), 1);
        assert_eq!(restored.words_used(), 0);
    }

    #[test]
    fn test_rejects_bad_block_headers_with_valid_checksum() {
        let (pool, _, _) = sample_pool(Direction::Ascending);
        let mut bytes = Vec::new();
        pool.write_to(&mut bytes).unwrap();

        // Break the first block's total length, then reseal the file
        let content_len = bytes.len() - CHECKSUM_BYTES;
        bytes[HEADER_BYTES..HEADER_BYTES + 4].copy_from_slice(&7u32.to_le_bytes());
        let checksum = crc32fast::hash(&bytes[..content_len]);
        bytes[content_len..].copy_from_slice(&checksum.to_le_bytes());

        let err = SegmentPool::read_from(&mut bytes.as_slice()).unwrap_err();
        assert!(err.is_corruption(), "unexpected error {:?}", err);
    }
}
