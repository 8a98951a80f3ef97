//! Word-oriented bit I/O for block packing
//!
//! Values are laid out least-significant bit first inside little-endian
//! `u32` words, so a packed block can live directly inside a segment.

/// Bit writer for packing values into words
#[derive(Debug)]
pub struct BitWriter {
    buffer: Vec<u32>,
    current: u64,
    bit_position: u32,
}

impl BitWriter {
    /// Create a new BitWriter
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            current: 0,
            bit_position: 0,
        }
    }

    /// Create with capacity hint in words
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            current: 0,
            bit_position: 0,
        }
    }

    /// Write the low `num_bits` bits of `value`
    #[inline]
    pub fn write_bits(&mut self, value: u32, num_bits: u32) {
        debug_assert!(num_bits <= 32);
        if num_bits == 0 {
            return;
        }

        let masked = (value as u64) & ((1u64 << num_bits) - 1);
        self.current |= masked << self.bit_position;
        self.bit_position += num_bits;

        if self.bit_position >= 32 {
            self.buffer.push(self.current as u32);
            self.current >>= 32;
            self.bit_position -= 32;
        }
    }

    /// Finish writing and return the words
    pub fn finish(mut self) -> Vec<u32> {
        if self.bit_position > 0 {
            self.buffer.push(self.current as u32);
        }
        self.buffer
    }

    /// Get current size in words
    pub fn len(&self) -> usize {
        self.buffer.len() + usize::from(self.bit_position > 0)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && self.bit_position == 0
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Bit reader for unpacking values from words
#[derive(Debug)]
pub struct BitReader<'a> {
    data: &'a [u32],
    word_position: usize,
    bit_position: u32,
}

impl<'a> BitReader<'a> {
    /// Create a new BitReader
    pub fn new(data: &'a [u32]) -> Self {
        Self {
            data,
            word_position: 0,
            bit_position: 0,
        }
    }

    /// Read `num_bits` bits, or `None` when the input runs out
    #[inline]
    pub fn read_bits(&mut self, num_bits: u32) -> Option<u32> {
        debug_assert!(num_bits <= 32);
        if num_bits == 0 {
            return Some(0);
        }

        let word = *self.data.get(self.word_position)?;
        let mut value = (word as u64) >> self.bit_position;
        let available = 32 - self.bit_position;
        if num_bits > available {
            let next = *self.data.get(self.word_position + 1)?;
            value |= (next as u64) << available;
        }

        self.bit_position += num_bits;
        while self.bit_position >= 32 {
            self.word_position += 1;
            self.bit_position -= 32;
        }

        Some((value & ((1u64 << num_bits) - 1)) as u32)
    }

    /// Get the current position in bits
    pub fn position(&self) -> usize {
        self.word_position * 32 + self.bit_position as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_writer_reader() {
        let mut writer = BitWriter::new();

        writer.write_bits(1, 1);
        writer.write_bits(0, 1);
        writer.write_bits(1, 1);
        writer.write_bits(0b1010_1010, 8);
        writer.write_bits(0xFF, 8);

        let data = writer.finish();
        assert_eq!(data.len(), 1);

        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(1), Some(1));
        assert_eq!(reader.read_bits(1), Some(0));
        assert_eq!(reader.read_bits(1), Some(1));
        assert_eq!(reader.read_bits(8), Some(0b1010_1010));
        assert_eq!(reader.read_bits(8), Some(0xFF));
        assert_eq!(reader.position(), 19);
    }

    #[test]
    fn test_values_straddle_word_boundary() {
        let mut writer = BitWriter::new();

        writer.write_bits(0b111, 3);
        writer.write_bits(0x1F_FFFF, 21);
        writer.write_bits(0xABCD, 16);
        writer.write_bits(0xDEAD_BEEF, 32);

        let data = writer.finish();
        assert_eq!(data.len(), 3);

        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(3), Some(0b111));
        assert_eq!(reader.read_bits(21), Some(0x1F_FFFF));
        assert_eq!(reader.read_bits(16), Some(0xABCD));
        assert_eq!(reader.read_bits(32), Some(0xDEAD_BEEF));
    }

    #[test]
    fn test_reader_reports_exhaustion() {
        let data = [0xFFFF_FFFFu32];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(20), Some(0xF_FFFF));
        assert_eq!(reader.read_bits(20), None);
    }
}
