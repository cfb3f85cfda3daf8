// Package storage provides the segmented LRU region.

use std::sync::Arc;

use super::list::LruMap;

/// Slru is the two-tier main region: keys enter probation and graduate
/// to protected on a second hit. Protected is bounded to roughly a fifth
/// of the region; overflow demotes its tail back to probation. A key
/// lives in at most one segment at a time.
pub struct Slru<V> {
    probation: LruMap<V>,
    protected: LruMap<V>,
    cap: usize,
}

impl<V> Slru<V> {
    /// Creates a segmented region bounded to `cap` entries in total.
    pub fn new(cap: usize) -> Self {
        let protected_cap = if cap == 0 { 0 } else { (cap / 5).max(1).min(cap) };
        // Probation is sized to the whole region: the 80/20 split is
        // enforced by demotion out of protected, and the caller guards
        // the total before inserting.
        Self {
            probation: LruMap::new(cap),
            protected: LruMap::new(protected_cap),
            cap,
        }
    }

    pub fn len(&self) -> usize {
        self.probation.len() + self.protected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn contains(&self, key: &str) -> bool {
        self.protected.contains(key) || self.probation.contains(key)
    }

    /// Looks up a value without touching recency or segment state.
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.protected
            .peek(key)
            .or_else(|| self.probation.peek(key))
    }

    /// Looks up a value. A protected hit refreshes recency; a probation
    /// hit promotes the entry into protected, demoting the protected
    /// tail back into probation when protected is over capacity.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        if self.protected.contains(key) {
            return self.protected.get(key);
        }
        if let Some(val) = self.probation.delete(key) {
            let (_, demoted) = self.protected.set(key, val);
            if let Some((dkey, dval)) = demoted {
                // Demoted tail re-enters probation at the head; a spill
                // past the region bound drops the probation tail.
                let _ = self.probation.insert_arc(dkey, dval);
            }
            // A zero-width protected segment bounces the promoted entry
            // straight back into probation.
            if self.protected.contains(key) {
                return self.protected.get(key);
            }
            return self.probation.get(key);
        }
        None
    }

    /// Inserts or updates a value. Updates happen in whichever segment
    /// holds the key; fresh keys always enter probation.
    pub fn set(&mut self, key: &str, val: V) -> (Option<V>, Option<(Arc<str>, V)>) {
        if self.protected.contains(key) {
            return self.protected.set(key, val);
        }
        self.probation.set(key, val)
    }

    /// Removes a key from whichever segment holds it.
    pub fn delete(&mut self, key: &str) -> Option<V> {
        self.protected
            .delete(key)
            .or_else(|| self.probation.delete(key))
    }

    /// Removes and returns the probation tail, the eviction victim
    /// candidate of the main region.
    pub fn pop_probation_tail(&mut self) -> Option<(Arc<str>, V)> {
        self.probation.pop_tail()
    }

    pub fn clear(&mut self) {
        self.probation.clear();
        self.protected.clear();
    }

    /// Visits entries of both segments in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &V)> + '_ {
        self.probation.iter().chain(self.protected.iter())
    }

    #[cfg(test)]
    pub fn probation_len(&self) -> usize {
        self.probation.len()
    }

    #[cfg(test)]
    pub fn protected_len(&self) -> usize {
        self.protected.len()
    }
}
