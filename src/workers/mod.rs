// Package workers provides the background tasks attached to a cache.

pub mod counters;
pub mod sweeper;

/// SweepBackend exposes the per-shard expiration hooks the sweeper
/// drives. One task serves one shard; the backend never blocks a task
/// on another shard's lock.
pub trait SweepBackend: Send + Sync + 'static {
    fn shard_count(&self) -> usize;

    /// Removes expired entries from one shard and reports how many
    /// were dropped.
    fn sweep_shard(&self, idx: usize, now_unix_nano: i64) -> usize;
}
