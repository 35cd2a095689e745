//! Per-collection routing tables
//!
//! A routing table pairs the collection's slice names, sorted
//! lexicographically, with the hash ranges produced by the
//! [`HashPartitioner`]. Tables are built lazily, at most once per collection
//! per snapshot, and shared by reference afterwards.

use crate::common::{Error, HashPartitioner, HashRange, Result};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Sorted shard names and their hash ranges; `ranges[i]` belongs to `shard_ids[i]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    collection: String,
    shard_ids: Vec<String>,
    ranges: Vec<HashRange>,
}

impl RoutingTable {
    pub fn build<I, S>(collection: impl Into<String>, slice_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut shard_ids: Vec<String> = slice_names.into_iter().map(Into::into).collect();
        shard_ids.sort();
        let ranges = HashPartitioner::new().partition(shard_ids.len());

        Self {
            collection: collection.into(),
            shard_ids,
            ranges,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn shard_ids(&self) -> &[String] {
        &self.shard_ids
    }

    pub fn ranges(&self) -> &[HashRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.shard_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shard_ids.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, HashRange)> {
        self.shard_ids
            .iter()
            .map(String::as_str)
            .zip(self.ranges.iter().copied())
    }

    pub fn range_of(&self, shard: &str) -> Option<HashRange> {
        self.shard_ids
            .iter()
            .position(|s| s == shard)
            .map(|i| self.ranges[i])
    }

    /// Shard owning `hash`: the first range whose upper bound is strictly
    /// greater than the hash.
    pub fn lookup(&self, hash: i32) -> Result<&str> {
        let hash64 = hash as i64;
        // Ranges are sorted and contiguous, so this is the first `max > hash`.
        let idx = self.ranges.partition_point(|r| r.max <= hash64);
        self.shard_ids
            .get(idx)
            .map(String::as_str)
            .ok_or_else(|| Error::RoutingInvariantViolation {
                collection: self.collection.clone(),
                hash,
            })
    }
}

/// Memoized routing tables keyed by collection.
///
/// Lookups of an existing cell take the map's read lock; the write lock is
/// only taken to insert a collection's write-once cell. The build itself
/// runs inside the cell, so concurrent first lookups for one collection wait
/// on a single builder while other collections proceed.
#[derive(Debug, Default)]
pub struct RoutingCache {
    cells: RwLock<HashMap<String, Arc<OnceCell<Arc<RoutingTable>>>>>,
}

impl RoutingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached table for `collection`, building it with `build` on first use.
    ///
    /// A failed build publishes nothing; the next call retries.
    pub fn get_or_build<F>(&self, collection: &str, build: F) -> Result<Arc<RoutingTable>>
    where
        F: FnOnce() -> Result<RoutingTable>,
    {
        let cell = self.cell(collection);
        cell.get_or_try_init(|| build().map(Arc::new)).cloned()
    }

    /// Already-built table, without building
    pub fn get(&self, collection: &str) -> Option<Arc<RoutingTable>> {
        let cells = self.cells.read().unwrap_or_else(PoisonError::into_inner);
        cells.get(collection).and_then(|cell| cell.get().cloned())
    }

    pub fn is_built(&self, collection: &str) -> bool {
        self.get(collection).is_some()
    }

    /// Number of collections with a published table
    pub fn built_count(&self) -> usize {
        let cells = self.cells.read().unwrap_or_else(PoisonError::into_inner);
        cells.values().filter(|cell| cell.get().is_some()).count()
    }

    fn cell(&self, collection: &str) -> Arc<OnceCell<Arc<RoutingTable>>> {
        {
            let cells = self.cells.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cell) = cells.get(collection) {
                return cell.clone();
            }
        }

        let mut cells = self.cells.write().unwrap_or_else(PoisonError::into_inner);
        cells
            .entry(collection.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }
}
