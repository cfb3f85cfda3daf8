// Package metrics provides the aggregated statistics snapshot and the
// health classification.

use std::fmt;

use serde::Serialize;

use crate::bytes::fmt_mem;

/// Stats is a point-in-time aggregate of the per-shard atomic counters.
/// Assembling it takes no locks, so totals may reflect an intermediate
/// state across shards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    /// Successful lookups.
    pub hits: u64,
    /// Lookups that found nothing (including expired entries).
    pub misses: u64,
    /// Total stored payload size estimate, in bytes.
    pub size: u64,
    /// Number of resident entries.
    pub keys: u64,
    /// hits / (hits + misses); zero when no lookups happened yet.
    pub hit_rate: f64,
}

impl Stats {
    /// Builds a snapshot, deriving the hit rate.
    pub fn new(hits: u64, misses: u64, size: u64, keys: u64) -> Self {
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };
        Self {
            hits,
            misses,
            size,
            keys,
            hit_rate,
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} keys={} size={} hit_rate={:.2}%",
            self.hits,
            self.misses,
            self.keys,
            fmt_mem(self.size),
            self.hit_rate * 100.0
        )
    }
}

/// Health classifies how much headroom the cache has left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    /// Resident entries are below the configured capacity.
    Healthy,
    /// The cache is at or over capacity; every admit now evicts.
    Full,
}

/// Classifies occupancy against the configured capacity.
pub fn classify(keys: u64, capacity: u64) -> Health {
    if keys < capacity {
        Health::Healthy
    } else {
        Health::Full
    }
}
