// Package workers provides the background expiration sweeper.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::time;

use super::counters::Counters;
use super::SweepBackend;

/// Spawns one sweeper task per shard. Each task wakes every
/// `interval`, removes that shard's expired entries, and exits promptly
/// once the token is cancelled. The caller joins the returned set with
/// a bounded grace period on close.
pub fn spawn(
    backend: Arc<dyn SweepBackend>,
    interval: Duration,
    token: CancellationToken,
    counters: Arc<Counters>,
) -> JoinSet<()> {
    let mut tasks = JoinSet::new();

    for idx in 0..backend.shard_count() {
        let backend = backend.clone();
        let token = token.clone();
        let counters = counters.clone();
        tasks.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick resolves immediately; the sweep of a fresh
            // shard is a no-op.
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!(shard = idx, "sweeper stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        let removed = backend.sweep_shard(idx, time::unix_nano());
                        counters.record_sweep(removed);
                        if removed > 0 {
                            tracing::debug!(shard = idx, removed, "expired entries swept");
                        }
                    }
                }
            }
        });
    }

    tasks
}
