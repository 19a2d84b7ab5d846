#![forbid(unsafe_code)]
//! Fixed-capacity LRU cache for remote block contents.
//!
//! The cache memoizes whole blocks keyed by (disk, block) so the session can
//! skip redundant round-trips to the array. Recency is tracked with a logical
//! clock: every lookup hit and every insert bumps the clock and stamps the
//! touched entry, so the entry with the smallest stamp is always the least
//! recently touched. Eviction scans the flat slot array for that minimum —
//! O(capacity) per insert, which is intentional at the 4096-entry cap and
//! keeps the storage a pointer-free `Vec` of in-place slots.
//!
//! The cache knows nothing about the wire protocol; it is pure in-memory
//! policy owned by whoever drives the session.

use njb_error::{NjbError, Result};
use njb_types::{Block, BlockId, DiskId, BLOCK_SIZE};
use std::fmt;
use tracing::trace;

/// Smallest allowed capacity in entries.
pub const MIN_ENTRIES: usize = 2;
/// Largest allowed capacity in entries.
pub const MAX_ENTRIES: usize = 4096;

#[derive(Clone)]
struct Entry {
    disk: DiskId,
    block: BlockId,
    valid: bool,
    stamp: u64,
    content: Block,
}

impl Entry {
    fn empty() -> Self {
        Self {
            disk: DiskId::ZERO,
            block: BlockId(0),
            valid: false,
            stamp: 0,
            content: [0_u8; BLOCK_SIZE],
        }
    }

    fn matches(&self, disk: DiskId, block: BlockId) -> bool {
        self.valid && self.disk == disk && self.block == block
    }
}

/// Cumulative lookup statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups issued.
    pub queries: u64,
    /// Lookups that found a resident entry.
    pub hits: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, 0.0 when nothing was queried yet.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        if self.queries == 0 {
            0.0
        } else {
            self.hits as f64 / self.queries as f64
        }
    }
}

/// Fixed-capacity associative block store with LRU eviction.
///
/// Invariant: at most one valid entry per (disk, block) pair.
pub struct BlockCache {
    entries: Vec<Entry>,
    clock: u64,
    stats: CacheStats,
}

impl BlockCache {
    /// Allocate a cache of `capacity` empty slots.
    ///
    /// Fails when `capacity` is outside `MIN_ENTRIES..=MAX_ENTRIES`.
    pub fn new(capacity: usize) -> Result<Self> {
        if !(MIN_ENTRIES..=MAX_ENTRIES).contains(&capacity) {
            return Err(NjbError::InvalidCapacity { capacity });
        }
        Ok(Self {
            entries: vec![Entry::empty(); capacity],
            clock: 0,
            stats: CacheStats::default(),
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Copy a resident block into `out`, refreshing its recency.
    ///
    /// Returns `false` on miss. Every call counts as a query.
    pub fn lookup(&mut self, disk: DiskId, block: BlockId, out: &mut Block) -> bool {
        self.stats.queries += 1;
        let Some(entry) = self.entries.iter_mut().find(|e| e.matches(disk, block)) else {
            return false;
        };
        out.copy_from_slice(&entry.content);
        self.clock += 1;
        entry.stamp = self.clock;
        self.stats.hits += 1;
        true
    }

    /// Overwrite an existing entry's content, refreshing its recency.
    ///
    /// Returns `false` without inserting when no entry matches.
    pub fn update(&mut self, disk: DiskId, block: BlockId, data: &Block) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.matches(disk, block)) else {
            return false;
        };
        entry.content.copy_from_slice(data);
        self.clock += 1;
        entry.stamp = self.clock;
        true
    }

    /// Insert a block, evicting the least recently touched entry when full.
    ///
    /// Fails on a duplicate (disk, block). The first invalid slot is
    /// populated when one exists; otherwise the slot with the minimum stamp
    /// is evicted, ties resolving to the first such slot in storage order.
    pub fn insert(&mut self, disk: DiskId, block: BlockId, data: &Block) -> Result<()> {
        let mut victim = 0_usize;
        let mut free = None;
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.matches(disk, block) {
                return Err(NjbError::DuplicateEntry {
                    disk: disk.get(),
                    block: block.0,
                });
            }
            if !entry.valid {
                if free.is_none() {
                    free = Some(index);
                }
            } else if entry.stamp < self.entries[victim].stamp {
                victim = index;
            }
        }

        let slot = match free {
            Some(index) => index,
            None => {
                let evicted = &self.entries[victim];
                trace!(
                    disk = %evicted.disk,
                    block = %evicted.block,
                    stamp = evicted.stamp,
                    "evicting least recently used entry"
                );
                victim
            }
        };

        self.clock += 1;
        let entry = &mut self.entries[slot];
        entry.disk = disk;
        entry.block = block;
        entry.valid = true;
        entry.stamp = self.clock;
        entry.content.copy_from_slice(data);
        Ok(())
    }
}

impl fmt::Debug for BlockCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockCache")
            .field("capacity", &self.entries.len())
            .field("resident", &self.entries.iter().filter(|e| e.valid).count())
            .field("clock", &self.clock)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(disk: u8, block: u8) -> (DiskId, BlockId) {
        (DiskId::new(disk).unwrap(), BlockId(block))
    }

    fn filled(byte: u8) -> Block {
        [byte; BLOCK_SIZE]
    }

    #[test]
    fn capacity_bounds_enforced() {
        assert!(matches!(
            BlockCache::new(MIN_ENTRIES - 1),
            Err(NjbError::InvalidCapacity { capacity: 1 })
        ));
        assert!(matches!(
            BlockCache::new(MAX_ENTRIES + 1),
            Err(NjbError::InvalidCapacity { capacity: 4097 })
        ));
        assert!(BlockCache::new(MIN_ENTRIES).is_ok());
        assert!(BlockCache::new(MAX_ENTRIES).is_ok());
    }

    #[test]
    fn insert_then_lookup_returns_same_bytes() {
        let mut cache = BlockCache::new(4).unwrap();
        let (disk, block) = ids(2, 7);
        cache.insert(disk, block, &filled(0xA5)).unwrap();

        let mut out = [0_u8; BLOCK_SIZE];
        assert!(cache.lookup(disk, block, &mut out));
        assert_eq!(out, filled(0xA5));
    }

    #[test]
    fn lookup_miss_leaves_buffer_alone() {
        let mut cache = BlockCache::new(4).unwrap();
        let mut out = filled(0x11);
        let (disk, block) = ids(0, 0);
        assert!(!cache.lookup(disk, block, &mut out));
        assert_eq!(out, filled(0x11));
    }

    #[test]
    fn duplicate_insert_fails() {
        let mut cache = BlockCache::new(4).unwrap();
        let (disk, block) = ids(1, 1);
        cache.insert(disk, block, &filled(1)).unwrap();
        assert!(matches!(
            cache.insert(disk, block, &filled(2)),
            Err(NjbError::DuplicateEntry { disk: 1, block: 1 })
        ));

        // The original content is untouched.
        let mut out = [0_u8; BLOCK_SIZE];
        assert!(cache.lookup(disk, block, &mut out));
        assert_eq!(out, filled(1));
    }

    #[test]
    fn update_never_inserts() {
        let mut cache = BlockCache::new(4).unwrap();
        let (disk, block) = ids(0, 9);
        assert!(!cache.update(disk, block, &filled(3)));

        let mut out = [0_u8; BLOCK_SIZE];
        assert!(!cache.lookup(disk, block, &mut out));
    }

    #[test]
    fn update_overwrites_existing_entry() {
        let mut cache = BlockCache::new(4).unwrap();
        let (disk, block) = ids(0, 9);
        cache.insert(disk, block, &filled(3)).unwrap();
        assert!(cache.update(disk, block, &filled(4)));

        let mut out = [0_u8; BLOCK_SIZE];
        assert!(cache.lookup(disk, block, &mut out));
        assert_eq!(out, filled(4));
    }

    #[test]
    fn full_cache_evicts_least_recently_touched() {
        let mut cache = BlockCache::new(4).unwrap();
        let mut out = [0_u8; BLOCK_SIZE];

        for block in 0..4 {
            let (d, b) = ids(0, block);
            cache.insert(d, b, &filled(block)).unwrap();
        }
        // Touch every entry in insertion order; (0,0) stays the oldest.
        for block in 0..4 {
            let (d, b) = ids(0, block);
            assert!(cache.lookup(d, b, &mut out));
        }

        let (d4, b4) = ids(0, 4);
        cache.insert(d4, b4, &filled(9)).unwrap();

        let (d0, b0) = ids(0, 0);
        assert!(!cache.lookup(d0, b0, &mut out), "(0,0) should be evicted");
        assert!(cache.lookup(d4, b4, &mut out));
        assert_eq!(out, filled(9));
        for block in 1..4 {
            let (d, b) = ids(0, block);
            assert!(cache.lookup(d, b, &mut out), "(0,{block}) should survive");
        }
    }

    #[test]
    fn lookup_refreshes_recency() {
        let mut cache = BlockCache::new(2).unwrap();
        let mut out = [0_u8; BLOCK_SIZE];
        let (d1, b1) = ids(0, 1);
        let (d2, b2) = ids(0, 2);
        let (d3, b3) = ids(0, 3);

        cache.insert(d1, b1, &filled(1)).unwrap();
        cache.insert(d2, b2, &filled(2)).unwrap();
        // (0,1) was inserted first but the hit makes (0,2) the LRU entry.
        assert!(cache.lookup(d1, b1, &mut out));

        cache.insert(d3, b3, &filled(3)).unwrap();
        assert!(cache.lookup(d1, b1, &mut out));
        assert!(!cache.lookup(d2, b2, &mut out), "(0,2) should be evicted");
    }

    #[test]
    fn stats_count_queries_and_hits() {
        let mut cache = BlockCache::new(2).unwrap();
        let mut out = [0_u8; BLOCK_SIZE];
        let (disk, block) = ids(0, 0);

        assert!(!cache.lookup(disk, block, &mut out));
        cache.insert(disk, block, &filled(5)).unwrap();
        assert!(cache.lookup(disk, block, &mut out));
        assert!(cache.lookup(disk, block, &mut out));

        let stats = cache.stats();
        assert_eq!(stats.queries, 3);
        assert_eq!(stats.hits, 2);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_cache_hit_rate_is_zero() {
        let cache = BlockCache::new(2).unwrap();
        assert_eq!(cache.stats().hit_rate(), 0.0);
    }
}
