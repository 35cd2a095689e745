//! Hash-space partitioning
//!
//! Routing hashes live in the full `i32` space. The space is split into
//! contiguous closed-open ranges, one per shard; the last range ends one past
//! `i32::MAX` so every hash is covered.

use serde::{Deserialize, Serialize};

/// Smallest routable hash
pub const HASH_SPACE_MIN: i64 = i32::MIN as i64;

/// Exclusive upper bound of the hash space
pub const HASH_SPACE_END: i64 = i32::MAX as i64 + 1;

/// Number of distinct hashes (2^32)
pub const HASH_SPACE_SIZE: u64 = (HASH_SPACE_END - HASH_SPACE_MIN) as u64;

/// A `[min, max)` slice of the hash space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashRange {
    pub min: i64,
    pub max: i64,
}

impl HashRange {
    pub fn new(min: i64, max: i64) -> Self {
        debug_assert!(min <= max, "inverted hash range [{}, {})", min, max);
        Self { min, max }
    }

    pub fn contains(&self, hash: i32) -> bool {
        let hash = hash as i64;
        self.min <= hash && hash < self.max
    }

    /// Number of hashes in the range
    pub fn width(&self) -> u64 {
        (self.max - self.min) as u64
    }
}

impl std::fmt::Display for HashRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.min, self.max)
    }
}

/// Splits the hash space into evenly sized ranges
#[derive(Debug, Default, Clone, Copy)]
pub struct HashPartitioner;

impl HashPartitioner {
    pub fn new() -> Self {
        Self
    }

    /// Partition the hash space into `partitions` contiguous ranges.
    ///
    /// When the space does not divide evenly, the first `2^32 % partitions`
    /// ranges are one hash wider than the rest. Zero partitions yields no
    /// ranges.
    pub fn partition(&self, partitions: usize) -> Vec<HashRange> {
        if partitions == 0 {
            return Vec::new();
        }

        let n = partitions as u64;
        let base = HASH_SPACE_SIZE / n;
        let extra = HASH_SPACE_SIZE % n;

        let mut ranges = Vec::with_capacity(partitions);
        let mut start = HASH_SPACE_MIN;
        for i in 0..n {
            let width = if i < extra { base + 1 } else { base };
            let end = start + width as i64;
            ranges.push(HashRange::new(start, end));
            start = end;
        }

        debug_assert_eq!(start, HASH_SPACE_END);
        ranges
    }
}
