// Package model provides the facade cache entry.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::storage::Stored;

use super::value::Value;

/// Maximum number of recycled entries retained by the pool.
const ENTRY_POOL_CAP: usize = 1024;

static ENTRY_POOL: Lazy<EntryPool> = Lazy::new(EntryPool::new);

/// Entry binds a key to a stored payload plus the bookkeeping the
/// facade layers on top of the eviction engines: expiration, access
/// tracking, size estimate and the stored-nil flag.
#[derive(Debug)]
pub struct Entry {
    key: Arc<str>,
    value: Value,
    raw: Option<Vec<u8>>,
    expires_at: i64,
    touched_at: AtomicI64,
    access_count: AtomicU64,
    size: u64,
    compressed: bool,
    is_nil: bool,
}

impl Entry {
    fn blank() -> Self {
        Self {
            key: Arc::from(""),
            value: Value::Nil,
            raw: None,
            expires_at: 0,
            touched_at: AtomicI64::new(0),
            access_count: AtomicU64::new(0),
            size: 0,
            compressed: false,
            is_nil: false,
        }
    }

    /// Populates a (possibly recycled) entry for insertion.
    #[allow(clippy::too_many_arguments)]
    pub fn assign(
        &mut self,
        key: Arc<str>,
        value: Value,
        raw: Option<Vec<u8>>,
        expires_at: i64,
        size: u64,
        is_nil: bool,
        now: i64,
    ) {
        self.compressed = raw.as_deref().map(super::payload::is_compressed).unwrap_or(false);
        self.key = key;
        self.value = value;
        self.raw = raw;
        self.expires_at = expires_at;
        self.touched_at.store(now, Ordering::Relaxed);
        self.access_count.store(0, Ordering::Relaxed);
        self.size = size;
        self.is_nil = is_nil;
    }

    /// Resets every field before the entry returns to the pool.
    pub fn reset(&mut self) {
        self.key = Arc::from("");
        self.value = Value::Nil;
        self.raw = None;
        self.expires_at = 0;
        self.touched_at.store(0, Ordering::Relaxed);
        self.access_count.store(0, Ordering::Relaxed);
        self.size = 0;
        self.compressed = false;
        self.is_nil = false;
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The decoded value for uncompressed entries; `Nil` otherwise.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The framed payload bytes for compressed-path entries.
    pub fn raw(&self) -> Option<&[u8]> {
        self.raw.as_deref()
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Records an access: bumps the access counter and the last-touch time.
    pub fn touch(&self, now: i64) {
        self.touched_at.store(now, Ordering::Relaxed);
        self.access_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn touched_at(&self) -> i64 {
        self.touched_at.load(Ordering::Relaxed)
    }

    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    /// The stored physical size estimate in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn compressed(&self) -> bool {
        self.compressed
    }

    /// True when the caller intentionally stored nil.
    pub fn is_nil(&self) -> bool {
        self.is_nil
    }
}

impl Stored for Arc<Entry> {
    fn is_expired(&self, now_unix_nano: i64) -> bool {
        self.expires_at != 0 && now_unix_nano > self.expires_at
    }

    fn weight(&self) -> u64 {
        self.size
    }
}

/// EntryPool recycles facade entries between insert and delete cycles.
pub struct EntryPool {
    entries: Mutex<Vec<Entry>>,
}

impl EntryPool {
    fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    fn acquire(&self) -> Entry {
        self.entries.lock().pop().unwrap_or_else(Entry::blank)
    }

    fn release(&self, mut entry: Entry) {
        entry.reset();
        let mut entries = self.entries.lock();
        if entries.len() < ENTRY_POOL_CAP {
            entries.push(entry);
        }
    }
}

/// Borrows a reset entry from the process-wide pool.
pub fn acquire_entry() -> Entry {
    ENTRY_POOL.acquire()
}

/// Recycles an entry once the cache is its sole owner.
pub fn recycle_entry(entry: Arc<Entry>) {
    if let Ok(owned) = Arc::try_unwrap(entry) {
        ENTRY_POOL.release(owned);
    }
}
