//! Cached time to avoid syscalls on hot expiry checks.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

static NOW_UNIX: AtomicI64 = AtomicI64::new(0);
static TICKERS: AtomicI64 = AtomicI64::new(0);

/// Starts the time caching ticker.
/// Updates the cached time value at the specified resolution.
/// Returns a token that stops the ticker when cancelled.
pub fn start(resolution: Duration) -> CancellationToken {
    NOW_UNIX.store(system_unix_nano(), Ordering::Relaxed);

    let token = CancellationToken::new();
    let token_clone = token.clone();
    // The guard keeps the ticker count honest even when the runtime
    // drops the task without delivering the cancellation.
    let guard = TickerGuard::new();

    tokio::task::spawn(async move {
        let _guard = guard;
        let mut interval = tokio::time::interval(resolution);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    NOW_UNIX.store(system_unix_nano(), Ordering::Relaxed);
                }
                _ = token_clone.cancelled() => {
                    break;
                }
            }
        }
    });

    token
}

struct TickerGuard;

impl TickerGuard {
    fn new() -> Self {
        TICKERS.fetch_add(1, Ordering::Relaxed);
        Self
    }
}

impl Drop for TickerGuard {
    fn drop(&mut self) {
        TICKERS.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Returns the current time as Unix nanoseconds.
/// Reads the cached value while a ticker is running, otherwise falls
/// back to a direct syscall.
pub fn unix_nano() -> i64 {
    if TICKERS.load(Ordering::Relaxed) > 0 {
        return NOW_UNIX.load(Ordering::Relaxed);
    }
    system_unix_nano()
}

/// Returns the current time.
pub fn now() -> SystemTime {
    UNIX_EPOCH + Duration::from_nanos(unix_nano() as u64)
}

fn system_unix_nano() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos() as i64
}
