// Package lfu provides the Count-Min Sketch implementation.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::hash::{mix64, next_pow2};

/// Number of hash rows. Fixed at construction so the aging math stays
/// consistent.
const DEPTH: usize = 4;
/// Aging fires once the access counter reaches `SAMPLE_MULTIPLIER *
/// capacity` increments.
const SAMPLE_MULTIPLIER: u64 = 10;
/// Row width is at least four counters per expected item.
const WIDTH_PER_ITEM: usize = 4;
const MIN_WIDTH: usize = 16;
const MAX_WIDTH: usize = 1 << 26;

/// CountMinSketch estimates access frequency with `DEPTH` salted rows of
/// counters. Estimates are the minimum over rows; aging halves every
/// cell so newer accesses weigh proportionally more.
pub struct CountMinSketch {
    rows: [Vec<AtomicU32>; DEPTH],
    /// Width - 1; width is a power of two.
    mask: u64,
    /// Total number of recorded accesses since the last aging pass.
    adds: AtomicU64,
    /// The logical aging window.
    reset_threshold: u64,
    /// Best-effort guard against concurrent full-table aging.
    aging_active: AtomicU32,
    enabled: bool,
}

impl CountMinSketch {
    /// Initializes a sketch sized for `capacity` expected items.
    pub fn new(capacity: usize) -> Self {
        let width = next_pow2(
            capacity
                .max(1)
                .saturating_mul(WIDTH_PER_ITEM)
                .clamp(MIN_WIDTH, MAX_WIDTH),
        );
        let rows = std::array::from_fn(|_| (0..width).map(|_| AtomicU32::new(0)).collect());
        Self {
            rows,
            mask: (width - 1) as u64,
            adds: AtomicU64::new(0),
            reset_threshold: capacity.max(1) as u64 * SAMPLE_MULTIPLIER,
            aging_active: AtomicU32::new(0),
            enabled: true,
        }
    }

    /// Creates a sketch that records nothing and admits everything.
    pub fn disabled() -> Self {
        let mut sketch = Self::new(1);
        sketch.enabled = false;
        sketch
    }

    /// Records one access: increments the salted cell in every row, then
    /// advances the aging counter, halving the table once the window is
    /// reached.
    pub fn record(&self, h: u64) {
        if !self.enabled {
            return;
        }
        let mut x = h;
        for row in &self.rows {
            row[(x & self.mask) as usize].fetch_add(1, Ordering::Relaxed);
            x = mix64(x);
        }
        self.adds.fetch_add(1, Ordering::Relaxed);
        self.maybe_age();
    }

    /// Returns the estimated frequency: the minimum of the salted cells.
    pub fn estimate(&self, h: u64) -> u32 {
        if !self.enabled {
            return 0;
        }
        let mut min = u32::MAX;
        let mut x = h;
        for row in &self.rows {
            let c = row[(x & self.mask) as usize].load(Ordering::Relaxed);
            min = min.min(c);
            x = mix64(x);
        }
        min
    }

    /// Decides whether a candidate should displace a victim.
    /// Ties admit the candidate so equal-frequency traffic drifts toward
    /// newer keys.
    pub fn should_admit(&self, candidate: u64, victim: u64) -> bool {
        if !self.enabled {
            return true;
        }
        self.estimate(candidate) >= self.estimate(victim)
    }

    /// Triggers aging once per window in a best-effort manner.
    fn maybe_age(&self) {
        if self.adds.load(Ordering::Relaxed) < self.reset_threshold {
            return;
        }
        if self
            .aging_active
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
        {
            // Double-check under the guard
            if self.adds.load(Ordering::Relaxed) >= self.reset_threshold {
                self.age();
                self.adds.store(0, Ordering::Relaxed);
            }
            self.aging_active.store(0, Ordering::Relaxed);
        }
    }

    /// Halves every cell in place. Increments racing with the halving
    /// are lossy by design.
    pub fn age(&self) {
        for row in &self.rows {
            for cell in row {
                let c = cell.load(Ordering::Relaxed);
                if c != 0 {
                    cell.store(c >> 1, Ordering::Relaxed);
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn width(&self) -> usize {
        (self.mask + 1) as usize
    }

    #[cfg(test)]
    pub(crate) fn reset_threshold(&self) -> u64 {
        self.reset_threshold
    }
}
