//! Bloom filter over node ids.
//!
//! Hash `i` is a 31-multiplier rolling hash seeded with `i`, run over the
//! UTF-16 code units of the key in wrapping 32-bit arithmetic, then reduced
//! modulo the bit count. Bits live in `u64` words.

use serde::{Deserialize, Serialize};

const WORD_BITS: usize = 64;

/// Fixed-size Bloom filter. No false negatives for inserted keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomFilter {
    words: Vec<u64>,
    bit_count: usize,
    hashes: u32,
}

impl BloomFilter {
    /// Create a filter of `bit_count` bits probed by `hashes` hash functions.
    ///
    /// Both are raised to at least 1.
    #[must_use]
    pub fn new(bit_count: usize, hashes: u32) -> Self {
        let bit_count = bit_count.max(1);
        Self {
            words: vec![0; bit_count.div_ceil(WORD_BITS)],
            bit_count,
            hashes: hashes.max(1),
        }
    }

    /// Size a filter for `items` keys: `max(items × bits_per_item, min_bits)`.
    #[must_use]
    pub fn with_capacity(items: usize, bits_per_item: usize, min_bits: usize, hashes: u32) -> Self {
        Self::new(items.saturating_mul(bits_per_item).max(min_bits), hashes)
    }

    fn position(&self, key: &str, seed: u32) -> usize {
        let hash = key.encode_utf16().fold(0u32, |h, unit| {
            h.wrapping_mul(31) ^ u32::from(unit).wrapping_add(seed)
        });
        hash as usize % self.bit_count
    }

    /// Set the key's bits.
    pub fn insert(&mut self, key: &str) {
        for seed in 0..self.hashes {
            let bit = self.position(key, seed);
            if let Some(word) = self.words.get_mut(bit / WORD_BITS) {
                *word |= 1 << (bit % WORD_BITS);
            }
        }
    }

    /// `false` means the key was never inserted; `true` means it may have been.
    #[must_use]
    pub fn might_contain(&self, key: &str) -> bool {
        (0..self.hashes).all(|seed| {
            let bit = self.position(key, seed);
            self.words
                .get(bit / WORD_BITS)
                .is_some_and(|word| word & (1 << (bit % WORD_BITS)) != 0)
        })
    }

    /// Number of bits in the filter.
    #[must_use]
    pub fn bit_count(&self) -> usize {
        self.bit_count
    }

    /// Number of hash functions.
    #[must_use]
    pub fn hashes(&self) -> u32 {
        self.hashes
    }

    /// Bytes held by the bit array.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.words.len() * (WORD_BITS / 8)
    }
}
