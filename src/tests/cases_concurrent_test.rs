// Concurrency tests: mixed workloads on disjoint keys, and shutdown
// while workers are active.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::{Cache, Value};

fn concurrent_config() -> Config {
    Config {
        cache_size: 4096,
        shard_count: 16,
        ttl: Duration::ZERO,
        ..Config::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_ops_on_disjoint_keys() {
    let cache = Arc::new(Cache::open(concurrent_config()));
    let workers = num_cpus::get().clamp(2, 8);
    const OPS: i64 = 2_000;

    let mut tasks = tokio::task::JoinSet::new();
    for worker in 0..workers {
        let cache = cache.clone();
        tasks.spawn(async move {
            for op in 0..OPS {
                let key = format!("w{}-k{}", worker, op % 64);
                let val = Value::Int(op);
                if cache.set(&key, val.clone()) {
                    // Disjoint key spaces: a read sees this worker's
                    // latest write or a post-eviction miss, never a
                    // foreign or stale value.
                    match cache.get(&key) {
                        Some(seen) => {
                            let stored = match seen {
                                Value::Int(n) => n,
                                other => panic!("corrupted value: {:?}", other),
                            };
                            assert!(
                                stored == op,
                                "lost update: wrote {} read {}",
                                op,
                                stored
                            );
                        }
                        None => {}
                    }
                }
                if op % 7 == 0 {
                    cache.delete(&key);
                    assert_eq!(cache.get(&key), None);
                }
            }
        });
    }

    while let Some(result) = tasks.join_next().await {
        result.expect("worker panicked");
    }

    let stats = cache.stats();
    assert!(stats.hits + stats.misses > 0);
    assert!(cache.size() <= 4096);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_while_workers_active() {
    let cache = Arc::new(Cache::open(Config {
        ttl: Duration::from_secs(60),
        cleanup_interval: Duration::from_millis(20),
        ..concurrent_config()
    }));

    let mut tasks = tokio::task::JoinSet::new();
    for worker in 0..4 {
        let cache = cache.clone();
        tasks.spawn(async move {
            for op in 0..10_000i64 {
                let key = format!("w{}-k{}", worker, op % 128);
                cache.set(&key, Value::Int(op));
                cache.get(&key);
                if op % 512 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        });
    }

    tokio::time::sleep(Duration::from_millis(10)).await;
    let closed = tokio::time::timeout(Duration::from_secs(6), cache.close()).await;
    assert!(closed.is_ok(), "close did not return in bounded time");

    // Workers race the shutdown but must terminate cleanly; their
    // post-close operations are no-ops.
    while let Some(result) = tasks.join_next().await {
        result.expect("worker panicked");
    }
    assert!(!cache.set("late", Value::Int(1)));
    assert_eq!(cache.get("late"), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_counters_stay_consistent() {
    let cache = Arc::new(Cache::open(concurrent_config()));

    let mut tasks = tokio::task::JoinSet::new();
    for worker in 0..4 {
        let cache = cache.clone();
        tasks.spawn(async move {
            for op in 0..1_000i64 {
                let key = format!("w{}-{}", worker, op % 32);
                cache.set(&key, Value::Int(op));
                cache.get(&key);
            }
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.expect("worker panicked");
    }

    let stats = cache.stats();
    // 4 workers x 1000 gets; every lookup lands in exactly one bucket.
    assert_eq!(stats.hits + stats.misses, 4_000);
    assert_eq!(cache.size() as u64, stats.keys);
}
