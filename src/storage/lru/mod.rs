// Package lru provides the plain sharded LRU engine, the alternative to
// W-TinyLFU for small caches.


use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::hash::key_hash;
use crate::time;

use super::list::LruMap;
use super::Stored;

/// LruShard guards one LRU map plus its counters.
struct LruShard<V> {
    list: RwLock<LruMap<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    mem: AtomicU64,
}

/// LruStorage hash-partitions keys across plain LRU shards. Every write
/// is admitted; overflow always evicts the shard's tail.
pub struct LruStorage<V: Stored> {
    shards: Vec<LruShard<V>>,
    mask: u32,
}

impl<V: Stored> LruStorage<V> {
    /// Creates `shard_count` shards (must be a power of two) of
    /// `per_shard_cap` entries each.
    pub fn new(shard_count: usize, per_shard_cap: usize) -> Self {
        debug_assert!(shard_count.is_power_of_two());
        let shards = (0..shard_count)
            .map(|_| LruShard {
                list: RwLock::new(LruMap::new(per_shard_cap.max(1))),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                mem: AtomicU64::new(0),
            })
            .collect();
        Self {
            shards,
            mask: (shard_count - 1) as u32,
        }
    }

    /// Gets a value by key, refreshing recency. Expired entries are
    /// removed in place and reported as misses.
    pub fn get(&self, key: &str) -> Option<V> {
        let shard = self.shard(key_hash(key));
        let now = time::unix_nano();

        // Fast path: misses resolve under the shared lock.
        {
            let list = shard.list.read();
            if list.peek(key).is_none() {
                shard.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        }

        let mut list = shard.list.write();
        let state = list.peek(key).map(|val| val.is_expired(now));
        match state {
            None => {
                shard.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some(true) => {
                if let Some(removed) = list.delete(key) {
                    shard.mem.fetch_sub(removed.weight(), Ordering::Relaxed);
                }
                shard.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some(false) => {
                let found = list.get(key).cloned();
                shard.hits.fetch_add(1, Ordering::Relaxed);
                found
            }
        }
    }

    /// Sets or updates a value, evicting the tail on overflow.
    /// Plain LRU admits every write.
    pub fn set(&self, key: &str, val: V) -> bool {
        let shard = self.shard(key_hash(key));
        let weight = val.weight();
        let mut list = shard.list.write();
        let (old, evicted) = list.set(key, val);
        if let Some(old) = old {
            shard.mem.fetch_sub(old.weight(), Ordering::Relaxed);
        }
        if let Some((_, gone)) = evicted {
            shard.mem.fetch_sub(gone.weight(), Ordering::Relaxed);
        }
        shard.mem.fetch_add(weight, Ordering::Relaxed);
        true
    }

    /// Reports presence without recency or statistics side effects.
    pub fn contains(&self, key: &str) -> bool {
        let shard = self.shard(key_hash(key));
        let now = time::unix_nano();
        let list = shard.list.read();
        match list.peek(key) {
            Some(val) => !val.is_expired(now),
            None => false,
        }
    }

    /// Removes a key. Returns the removed value.
    pub fn delete(&self, key: &str) -> Option<V> {
        let shard = self.shard(key_hash(key));
        let mut list = shard.list.write();
        let removed = list.delete(key);
        if let Some(ref val) = removed {
            shard.mem.fetch_sub(val.weight(), Ordering::Relaxed);
        }
        removed
    }

    /// Drops every entry in every shard.
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.list.write().clear();
            shard.mem.store(0, Ordering::Relaxed);
        }
    }

    pub fn len(&self) -> u64 {
        self.shards
            .iter()
            .map(|s| s.list.read().len() as u64)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mem(&self) -> u64 {
        self.shards.iter().map(|s| s.mem.load(Ordering::Relaxed)).sum()
    }

    pub fn hits(&self) -> u64 {
        self.shards
            .iter()
            .map(|s| s.hits.load(Ordering::Relaxed))
            .sum()
    }

    pub fn misses(&self) -> u64 {
        self.shards
            .iter()
            .map(|s| s.misses.load(Ordering::Relaxed))
            .sum()
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Removes expired entries from one shard.
    pub fn sweep_shard(&self, idx: usize, now: i64) -> usize {
        let shard = &self.shards[idx];
        let mut list = shard.list.write();
        let expired: Vec<std::sync::Arc<str>> = list
            .iter()
            .filter(|(_, val)| val.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            if let Some(removed) = list.delete(key) {
                shard.mem.fetch_sub(removed.weight(), Ordering::Relaxed);
            }
        }
        expired.len()
    }

    fn shard(&self, h: u64) -> &LruShard<V> {
        &self.shards[((h as u32) & self.mask) as usize]
    }
}
