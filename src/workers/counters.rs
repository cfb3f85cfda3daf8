// Package workers provides counters for the expiration sweeper.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracks sweeper activity across all shard tasks.
pub struct Counters {
    /// Total sweep passes over any shard.
    pub sweeps_total: AtomicU64,
    /// Sweeps that removed at least one entry.
    pub sweeps_hit: AtomicU64,
    /// Sweeps that found nothing expired.
    pub sweeps_miss: AtomicU64,
    /// Total entries removed by sweeping.
    pub removed_total: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self {
            sweeps_total: AtomicU64::new(0),
            sweeps_hit: AtomicU64::new(0),
            sweeps_miss: AtomicU64::new(0),
            removed_total: AtomicU64::new(0),
        }
    }

    /// Records one sweep pass and its removal count.
    pub fn record_sweep(&self, removed: usize) {
        self.sweeps_total.fetch_add(1, Ordering::Relaxed);
        if removed > 0 {
            self.sweeps_hit.fetch_add(1, Ordering::Relaxed);
            self.removed_total.fetch_add(removed as u64, Ordering::Relaxed);
        } else {
            self.sweeps_miss.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn sweeps(&self) -> u64 {
        self.sweeps_total.load(Ordering::Relaxed)
    }

    pub fn removed(&self) -> u64 {
        self.removed_total.load(Ordering::Relaxed)
    }
}

impl Default for Counters {
    fn default() -> Self {
        Self::new()
    }
}
