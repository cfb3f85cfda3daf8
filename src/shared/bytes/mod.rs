// Package bytes provides a process-wide reusable byte-buffer pool.

use once_cell::sync::Lazy;
use parking_lot::Mutex;

/// Maximum number of buffers retained in the pool.
const POOL_CAP: usize = 128;
/// Buffers grown past this size are dropped instead of pooled.
const MAX_RETAINED_LEN: usize = 1 << 20;

static POOL: Lazy<BufPool> = Lazy::new(BufPool::new);

/// BufPool is a bounded free-list of scratch buffers used by the codec.
pub struct BufPool {
    bufs: Mutex<Vec<Vec<u8>>>,
}

impl BufPool {
    fn new() -> Self {
        Self {
            bufs: Mutex::new(Vec::new()),
        }
    }

    fn get(&self) -> Vec<u8> {
        self.bufs.lock().pop().unwrap_or_default()
    }

    fn put(&self, mut buf: Vec<u8>) {
        if buf.capacity() > MAX_RETAINED_LEN {
            return;
        }
        buf.clear();
        let mut bufs = self.bufs.lock();
        if bufs.len() < POOL_CAP {
            bufs.push(buf);
        }
    }
}

/// Borrows a cleared buffer from the process-wide pool.
pub fn get_buf() -> Vec<u8> {
    POOL.get()
}

/// Returns a buffer to the pool. The buffer is reset before reuse.
pub fn put_buf(buf: Vec<u8>) {
    POOL.put(buf);
}

/// Formats a byte count as a human-readable string.
pub fn fmt_mem(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    match bytes {
        b if b >= TB => format!("{}TB {}GB", b / TB, (b % TB) / GB),
        b if b >= GB => format!("{}GB {}MB", b / GB, (b % GB) / MB),
        b if b >= MB => format!("{}MB {}KB", b / MB, (b % MB) / KB),
        b if b >= KB => format!("{}KB {}B", b / KB, b % KB),
        b => format!("{}B", b),
    }
}
