//! Bloom filter for per-block docID membership
//!
//! Filters are stored as plain `u32` words inside a block, so the hash has
//! to be stable across processes: docIDs are mixed with a fixed 64-bit
//! finalizer instead of the std hasher.

use crate::DocId;

const SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Number of words needed for `num_keys` keys at `bits_per_key` bits each
pub fn required_words(num_keys: usize, bits_per_key: usize) -> usize {
    (num_keys * bits_per_key).div_ceil(32).max(1)
}

/// Optimal number of hash functions for a bits-per-key budget
pub fn optimal_hashes(bits_per_key: usize) -> u32 {
    let num_hashes = ((bits_per_key as f64) * 0.69).round() as u32;
    num_hashes.clamp(1, 30)
}

/// Owned Bloom filter, used while a block is being built
#[derive(Debug, Clone)]
pub struct BloomFilter {
    words: Vec<u32>,
    num_hashes: u32,
}

impl BloomFilter {
    /// Create an empty filter sized for `num_keys` keys
    pub fn new(num_keys: usize, bits_per_key: usize, num_hashes: u32) -> Self {
        Self {
            words: vec![0u32; required_words(num_keys, bits_per_key)],
            num_hashes: num_hashes.max(1),
        }
    }

    /// Build a filter over every docID in `keys`
    pub fn from_keys(keys: &[DocId], bits_per_key: usize, num_hashes: u32) -> Self {
        let mut filter = Self::new(keys.len(), bits_per_key, num_hashes);
        for &key in keys {
            filter.insert(key);
        }
        filter
    }

    /// Add a key to the filter
    pub fn insert(&mut self, key: DocId) {
        let (h1, h2) = hash_key(key);
        let num_bits = self.words.len() * 32;

        for i in 0..self.num_hashes {
            let bit = bit_position(h1, h2, i, num_bits);
            self.words[bit / 32] |= 1 << (bit % 32);
        }
    }

    /// Check if a key may be in the set
    pub fn may_contain(&self, key: DocId) -> bool {
        self.view().may_contain(key)
    }

    /// Borrow as a view
    pub fn view(&self) -> BloomView<'_> {
        BloomView::new(&self.words, self.num_hashes)
    }

    /// Get the raw words
    pub fn as_words(&self) -> &[u32] {
        &self.words
    }

    /// Get number of hash functions
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Estimated false positive rate
    pub fn false_positive_rate(&self, num_keys: usize) -> f64 {
        let k = self.num_hashes as f64;
        let m = (self.words.len() * 32) as f64;
        let n = num_keys as f64;
        (1.0 - (-k * n / m).exp()).powf(k)
    }
}

/// Read-only filter over words stored in a segment
#[derive(Debug, Clone, Copy)]
pub struct BloomView<'a> {
    words: &'a [u32],
    num_hashes: u32,
}

impl<'a> BloomView<'a> {
    /// Wrap stored filter words
    pub fn new(words: &'a [u32], num_hashes: u32) -> Self {
        Self { words, num_hashes }
    }

    /// Check if a key may be in the set. An empty view accepts everything.
    pub fn may_contain(&self, key: DocId) -> bool {
        if self.words.is_empty() {
            return true;
        }

        let (h1, h2) = hash_key(key);
        let num_bits = self.words.len() * 32;

        for i in 0..self.num_hashes {
            let bit = bit_position(h1, h2, i, num_bits);
            if (self.words[bit / 32] >> (bit % 32)) & 1 == 0 {
                return false;
            }
        }

        true
    }
}

#[inline]
fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

#[inline]
fn hash_key(key: DocId) -> (u64, u64) {
    let h1 = mix64(key as u64 ^ SEED);
    let h2 = mix64(h1) | 1;
    (h1, h2)
}

#[inline]
fn bit_position(h1: u64, h2: u64, i: u32, num_bits: usize) -> usize {
    let hash = h1.wrapping_add((i as u64).wrapping_mul(h2));
    (hash % num_bits as u64) as usize
}
