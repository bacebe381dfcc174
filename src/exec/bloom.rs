//! Bloom filter used by FilterJoin/LIP to pre-probe a fact table against
//! an already-filtered dimension's PK column before confirming against
//! the dimension's hash table (spec §4.5 step 1).
//!
//! Grounded on `ahash`, the same hasher the join hash table and the
//! aggregate group-hash already use, so inserting a key here and
//! looking it up in a `JoinHashTable` hash consistently.

use std::hash::{Hash, Hasher};

pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: usize,
    num_hashes: u32,
}

impl BloomFilter {
    /// `num_bits` should be a power of two; `num_hashes` controls the
    /// false-positive rate (3-4 is a reasonable default for dimension
    /// PK columns in the low-millions).
    pub fn new(num_bits: usize, num_hashes: u32) -> Self {
        let words = (num_bits.max(64) + 63) / 64;
        Self {
            bits: vec![0u64; words],
            num_bits: words * 64,
            num_hashes: num_hashes.max(1),
        }
    }

    pub fn with_expected_items(expected_items: usize) -> Self {
        let bits = (expected_items.max(1) * 10).next_power_of_two();
        Self::new(bits, 4)
    }

    fn hash_pair(key: i64) -> (u64, u64) {
        let mut h1 = ahash::AHasher::default();
        key.hash(&mut h1);
        let a = h1.finish();

        let mut h2 = ahash::AHasher::default();
        (key ^ 0x5bd1e995u64 as i64).hash(&mut h2);
        let b = h2.finish();
        (a, b)
    }

    /// Double hashing (Kirsch-Mitzenmacher): derive `num_hashes` bit
    /// positions from two independent base hashes.
    fn positions(&self, key: i64) -> impl Iterator<Item = usize> + '_ {
        let (a, b) = Self::hash_pair(key);
        (0..self.num_hashes).map(move |i| {
            let combined = a.wrapping_add((i as u64).wrapping_mul(b));
            (combined as usize) % self.num_bits
        })
    }

    pub fn insert(&mut self, key: i64) {
        for pos in self.positions(key).collect::<Vec<_>>() {
            self.bits[pos / 64] |= 1u64 << (pos % 64);
        }
    }

    /// May return a false positive; never a false negative.
    pub fn test(&self, key: i64) -> bool {
        self.positions(key).all(|pos| self.bits[pos / 64] & (1u64 << (pos % 64)) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_keys_always_test_positive() {
        let mut bloom = BloomFilter::with_expected_items(100);
        for k in 0..100i64 {
            bloom.insert(k);
        }
        for k in 0..100i64 {
            assert!(bloom.test(k));
        }
    }

    #[test]
    fn absent_keys_mostly_test_negative() {
        let mut bloom = BloomFilter::with_expected_items(1000);
        for k in 0..1000i64 {
            bloom.insert(k);
        }
        let false_positives = (2000..3000i64).filter(|&k| bloom.test(k)).count();
        assert!(false_positives < 100, "false positive rate too high: {false_positives}/1000");
    }
}
