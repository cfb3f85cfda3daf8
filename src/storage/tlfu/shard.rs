// Package tlfu provides the W-TinyLFU shard implementation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::hash::key_hash;
use crate::time;

use super::super::lfu::CountMinSketch;
use super::super::list::LruMap;
use super::super::slru::Slru;
use super::super::Stored;

/// Window share of the shard capacity, in percent.
const WINDOW_PERCENT: usize = 1;

/// Regions are the shard's two eviction areas, guarded together.
struct Regions<V> {
    window: LruMap<V>,
    main: Slru<V>,
}

/// Shard is an independent W-TinyLFU partition: a small window LRU in
/// front of a segmented main region, with a frequency sketch arbitrating
/// admission once both are full. Mutators serialize on the write mutex;
/// readers share the region lock and upgrade only to apply promotions.
pub struct Shard<V: Stored> {
    regions: RwLock<Regions<V>>,
    sketch: CountMinSketch,
    write_mu: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
    len: AtomicU64,
    mem: AtomicU64,
    capacity: usize,
}

impl<V: Stored> Shard<V> {
    /// Creates a shard bounded to `capacity` entries. The window takes
    /// 1% (minimum one slot); shards of a single slot run with an empty
    /// main region and degenerate to a pure LRU.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let window_cap = (capacity.saturating_mul(WINDOW_PERCENT) / 100)
            .max(1)
            .min(capacity);
        let main_cap = capacity - window_cap;
        Self {
            regions: RwLock::new(Regions {
                window: LruMap::new(window_cap),
                main: Slru::new(main_cap),
            }),
            sketch: CountMinSketch::new(capacity),
            write_mu: Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            len: AtomicU64::new(0),
            mem: AtomicU64::new(0),
            capacity,
        }
    }

    /// Looks up a value, refreshing recency and promoting probation hits.
    /// Expired values found on the way are removed in place.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = time::unix_nano();

        // Fast path: misses resolve under the shared lock.
        {
            let regions = self.regions.read();
            if regions.window.peek(key).is_none() && regions.main.peek(key).is_none() {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        }

        // Hit path: upgrade to the write side for the recency splice and
        // the probation-to-protected promotion. The entry may have been
        // evicted in between, which then counts as a miss.
        let _w = self.write_mu.lock();
        let mut regions = self.regions.write();

        let state = match regions.window.peek(key) {
            Some(val) => Some(val.is_expired(now)),
            None => regions.main.peek(key).map(|val| val.is_expired(now)),
        };

        match state {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some(true) => {
                self.remove_accounted(&mut regions, key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some(false) => {
                let found = match regions.window.get(key).cloned() {
                    Some(val) => Some(val),
                    None => regions.main.get(key).cloned(),
                };
                self.hits.fetch_add(1, Ordering::Relaxed);
                found
            }
        }
    }

    /// Sets or updates a value. Returns false when the frequency sketch
    /// rejects the candidate; rejected writes are expected, not errors.
    pub fn set(&self, key: &str, h: u64, val: V) -> bool {
        let _w = self.write_mu.lock();
        self.sketch.record(h);

        let weight = val.weight();
        let mut regions = self.regions.write();

        // Present anywhere: update in place.
        if regions.window.contains(key) {
            let (old, _) = regions.window.set(key, val);
            self.swap_mem(old.as_ref().map(Stored::weight).unwrap_or(0), weight);
            return true;
        }
        if regions.main.contains(key) {
            let (old, _) = regions.main.set(key, val);
            self.swap_mem(old.as_ref().map(Stored::weight).unwrap_or(0), weight);
            return true;
        }

        // Free slots fill the window first, then probation.
        if regions.window.len() < regions.window.cap() {
            let _ = regions.window.set(key, val);
            self.add_entry(weight);
            return true;
        }
        if regions.main.len() < regions.main.cap() {
            let _ = regions.main.set(key, val);
            self.add_entry(weight);
            return true;
        }

        // Both regions full: the window tail is the victim candidate.
        match regions.window.peek_tail_key() {
            None => {
                // Degenerate tiny cache with an empty window.
                let (_, evicted) = regions.window.set(key, val);
                self.account_insert(weight, evicted);
                true
            }
            Some(victim) => {
                if self.sketch.should_admit(h, key_hash(&victim)) {
                    let (_, evicted) = regions.window.set(key, val);
                    self.account_insert(weight, evicted);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Reports presence without touching recency, promotion or the
    /// hit/miss counters. Expired entries count as absent.
    pub fn contains(&self, key: &str) -> bool {
        let now = time::unix_nano();
        let regions = self.regions.read();
        match regions.window.peek(key).or_else(|| regions.main.peek(key)) {
            Some(val) => !val.is_expired(now),
            None => false,
        }
    }

    /// Removes a key from both regions. Returns the removed value.
    pub fn delete(&self, key: &str) -> Option<V> {
        let _w = self.write_mu.lock();
        let mut regions = self.regions.write();
        self.remove_accounted(&mut regions, key)
    }

    /// Drops every entry. Hit and miss counters survive.
    pub fn clear(&self) {
        let _w = self.write_mu.lock();
        let mut regions = self.regions.write();
        regions.window.clear();
        regions.main.clear();
        self.len.store(0, Ordering::Relaxed);
        self.mem.store(0, Ordering::Relaxed);
    }

    /// Removes every expired entry. Called by the background sweeper.
    pub fn sweep_expired(&self, now: i64) -> usize {
        let _w = self.write_mu.lock();
        let mut regions = self.regions.write();

        let expired: Vec<Arc<str>> = regions
            .window
            .iter()
            .chain(regions.main.iter())
            .filter(|(_, val)| val.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove_accounted(&mut regions, key);
        }
        expired.len()
    }

    pub fn len(&self) -> u64 {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mem(&self) -> u64 {
        self.mem.load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn remove_accounted(&self, regions: &mut Regions<V>, key: &str) -> Option<V> {
        let removed = regions
            .window
            .delete(key)
            .or_else(|| regions.main.delete(key));
        if let Some(ref val) = removed {
            self.len.fetch_sub(1, Ordering::Relaxed);
            self.mem.fetch_sub(val.weight(), Ordering::Relaxed);
        }
        removed
    }

    fn add_entry(&self, weight: u64) {
        self.len.fetch_add(1, Ordering::Relaxed);
        self.mem.fetch_add(weight, Ordering::Relaxed);
    }

    fn swap_mem(&self, old_weight: u64, new_weight: u64) {
        self.mem.fetch_sub(old_weight, Ordering::Relaxed);
        self.mem.fetch_add(new_weight, Ordering::Relaxed);
    }

    fn account_insert(&self, weight: u64, evicted: Option<(Arc<str>, V)>) {
        match evicted {
            Some((_, old)) => self.swap_mem(old.weight(), weight),
            None => self.add_entry(weight),
        }
    }
}
