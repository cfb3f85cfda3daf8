// Package cache provides the generic cache facade: validation, TTL,
// compression and admission-policy dispatch layered over a sharded
// eviction engine.

pub mod admission;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, EvictionPolicy};
use crate::metrics::{classify, Health, Stats};
use crate::model::payload::{decode_payload, encode_payload};
use crate::model::{acquire_entry, recycle_entry, Entry, Value};
use crate::storage::lru::LruStorage;
use crate::storage::tlfu::TlfuStorage;
use crate::time;
use crate::workers::counters::Counters;
use crate::workers::{sweeper, SweepBackend};

/// Resolution of the cached clock driving expiry checks.
const CLOCK_RESOLUTION: Duration = Duration::from_millis(1);

/// Bounded grace period close() waits for sweeper shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Engine is the selected sharded eviction policy.
enum Engine {
    Tlfu(TlfuStorage<Arc<Entry>>),
    Lru(LruStorage<Arc<Entry>>),
}

impl Engine {
    fn get(&self, key: &str) -> Option<Arc<Entry>> {
        match self {
            Engine::Tlfu(s) => s.get(key),
            Engine::Lru(s) => s.get(key),
        }
    }

    fn set(&self, key: &str, entry: Arc<Entry>) -> bool {
        match self {
            Engine::Tlfu(s) => s.set(key, entry),
            Engine::Lru(s) => s.set(key, entry),
        }
    }

    fn contains(&self, key: &str) -> bool {
        match self {
            Engine::Tlfu(s) => s.contains(key),
            Engine::Lru(s) => s.contains(key),
        }
    }

    fn delete(&self, key: &str) -> Option<Arc<Entry>> {
        match self {
            Engine::Tlfu(s) => s.delete(key),
            Engine::Lru(s) => s.delete(key),
        }
    }

    fn clear(&self) {
        match self {
            Engine::Tlfu(s) => s.clear(),
            Engine::Lru(s) => s.clear(),
        }
    }

    fn len(&self) -> u64 {
        match self {
            Engine::Tlfu(s) => s.len(),
            Engine::Lru(s) => s.len(),
        }
    }

    fn mem(&self) -> u64 {
        match self {
            Engine::Tlfu(s) => s.mem(),
            Engine::Lru(s) => s.mem(),
        }
    }

    fn hits(&self) -> u64 {
        match self {
            Engine::Tlfu(s) => s.hits(),
            Engine::Lru(s) => s.hits(),
        }
    }

    fn misses(&self) -> u64 {
        match self {
            Engine::Tlfu(s) => s.misses(),
            Engine::Lru(s) => s.misses(),
        }
    }
}

impl SweepBackend for Engine {
    fn shard_count(&self) -> usize {
        match self {
            Engine::Tlfu(s) => s.shard_count(),
            Engine::Lru(s) => s.shard_count(),
        }
    }

    fn sweep_shard(&self, idx: usize, now_unix_nano: i64) -> usize {
        match self {
            Engine::Tlfu(s) => s.sweep_shard(idx, now_unix_nano),
            Engine::Lru(s) => s.sweep_shard(idx, now_unix_nano),
        }
    }
}

/// Cache is the embeddable facade. It validates keys and values,
/// dispatches the admission policy, applies TTL and optional gzip
/// compression, and routes every operation to the selected engine.
pub struct Cache {
    cfg: Config,
    engine: Arc<Engine>,
    admission: admission::AdmissionPolicy,
    ttl_nanos: i64,
    capacity: u64,
    closed: AtomicBool,
    shutdown: CancellationToken,
    clock: Mutex<Option<CancellationToken>>,
    sweepers: Mutex<Option<JoinSet<()>>>,
    sweep_counters: Arc<Counters>,
}

impl Cache {
    /// Opens a cache from a (normalized) configuration. Background
    /// sweepers and the cached clock start only when a tokio runtime is
    /// ambient; without one the cache still works and expires lazily on
    /// read.
    pub fn open(cfg: Config) -> Self {
        let cfg = cfg.normalized();

        let shard_count = cfg.shard_count;
        let per_shard = cfg.per_shard_capacity();
        let engine = Arc::new(match cfg.resolved_policy() {
            EvictionPolicy::WTinyLfu => Engine::Tlfu(TlfuStorage::new(shard_count, per_shard)),
            EvictionPolicy::Lru => Engine::Lru(LruStorage::new(shard_count, per_shard)),
        });

        let ttl_nanos = cfg.ttl.as_nanos() as i64;
        let shutdown = CancellationToken::new();

        let sweep_counters = Arc::new(Counters::new());
        let mut clock = None;
        let mut sweepers = None;
        if tokio::runtime::Handle::try_current().is_ok() {
            clock = Some(time::start(CLOCK_RESOLUTION));
            if ttl_nanos > 0 {
                let backend: Arc<dyn SweepBackend> = engine.clone();
                sweepers = Some(sweeper::spawn(
                    backend,
                    cfg.cleanup_interval,
                    shutdown.clone(),
                    sweep_counters.clone(),
                ));
                tracing::debug!(
                    shards = shard_count,
                    interval = ?cfg.cleanup_interval,
                    "expiration sweepers started"
                );
            }
        }

        Self {
            capacity: cfg.cache_size as u64,
            admission: admission::AdmissionPolicy::from_config(&cfg),
            cfg,
            engine,
            ttl_nanos,
            closed: AtomicBool::new(false),
            shutdown,
            clock: Mutex::new(clock),
            sweepers: Mutex::new(sweepers),
            sweep_counters,
        }
    }

    /// Reports presence without refreshing recency or counting a
    /// lookup. Expired entries count as absent.
    pub fn exists(&self, key: &str) -> bool {
        if !self.is_active() {
            return false;
        }
        self.engine.contains(key)
    }

    /// Looks up a key. Returns `Some(Value::Nil)` for an intentionally
    /// stored nil, `None` for absent, expired or undecodable entries.
    pub fn get(&self, key: &str) -> Option<Value> {
        if !self.is_active() {
            return None;
        }

        let entry = self.engine.get(key)?;
        entry.touch(time::unix_nano());

        if entry.is_nil() {
            return Some(Value::Nil);
        }
        match entry.raw() {
            None => Some(entry.value().clone()),
            Some(raw) => match decode_payload(raw) {
                Ok(value) => Some(value),
                Err(err) => {
                    // A payload that no longer decodes is evicted so it
                    // cannot poison later reads.
                    tracing::warn!(error = %err, "dropping undecodable payload");
                    if let Some(removed) = self.engine.delete(key) {
                        recycle_entry(removed);
                    }
                    None
                }
            },
        }
    }

    /// Stores a value. Returns false when validation, the admission
    /// policy or the engine's frequency gate declined the write; a
    /// rejected write is expected, not an error.
    pub fn set(&self, key: &str, value: Value) -> bool {
        if !self.is_active() {
            return false;
        }
        if key.is_empty() {
            return false;
        }
        if self.cfg.max_key_size > 0 && key.len() > self.cfg.max_key_size {
            return false;
        }
        if self.cfg.max_value_size > 0 && value.estimate_size() > self.cfg.max_value_size as u64 {
            return false;
        }
        if !self.admission.admit() {
            return false;
        }

        let is_nil = value.is_nil();
        let now = time::unix_nano();
        let expires_at = if self.ttl_nanos > 0 {
            now + self.ttl_nanos
        } else {
            0
        };

        // Serialization and compression run before any shard lock is
        // taken.
        let mut entry = acquire_entry();
        if self.cfg.enable_compression {
            let raw = match encode_payload(&value) {
                Ok(raw) => raw,
                Err(_) => return false,
            };
            let size = raw.len() as u64;
            entry.assign(Arc::from(key), Value::Nil, Some(raw), expires_at, size, is_nil, now);
        } else {
            let size = value.estimate_size();
            entry.assign(Arc::from(key), value, None, expires_at, size, is_nil, now);
        }

        self.engine.set(key, Arc::new(entry))
    }

    /// Removes a key. Returns whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        if !self.is_active() {
            return false;
        }
        match self.engine.delete(key) {
            Some(removed) => {
                recycle_entry(removed);
                true
            }
            None => false,
        }
    }

    /// Drops every entry. A no-op on a closed cache.
    pub fn clear(&self) {
        if !self.is_active() {
            return;
        }
        self.engine.clear();
    }

    /// Number of resident entries.
    pub fn size(&self) -> usize {
        self.engine.len() as usize
    }

    /// Lock-free statistics snapshot.
    pub fn stats(&self) -> Stats {
        Stats::new(
            self.engine.hits(),
            self.engine.misses(),
            self.engine.mem(),
            self.engine.len(),
        )
    }

    /// Occupancy classification from the same snapshot counters.
    pub fn health(&self) -> Health {
        classify(self.engine.len(), self.capacity)
    }

    /// Activity counters of the background sweepers.
    pub fn sweeper_counters(&self) -> &Counters {
        &self.sweep_counters
    }

    /// Stops the background sweepers, waits a bounded grace period for
    /// them to exit, then clears all shards. Idempotent; every
    /// operation after close is a no-op.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.cancel();

        let tasks = self.sweepers.lock().take();
        if let Some(mut tasks) = tasks {
            let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
                while tasks.join_next().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                tracing::warn!("sweepers did not stop within the grace period");
                tasks.abort_all();
            }
        }

        if let Some(clock) = self.clock.lock().take() {
            clock.cancel();
        }

        let last = self.stats();
        self.engine.clear();
        tracing::debug!(stats = %last, "cache closed");
    }

    fn is_active(&self) -> bool {
        self.cfg.enable_caching && !self.closed.load(Ordering::Relaxed)
    }
}

impl Drop for Cache {
    fn drop(&mut self) {
        // Dropping without close() still stops the background tasks.
        self.shutdown.cancel();
        if let Some(clock) = self.clock.lock().take() {
            clock.cancel();
        }
    }
}
