// Integration tests for the compression path: round-trips, physical
// size and stored-nil interplay.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::Config;
use crate::{Cache, Value};

fn compressed_config() -> Config {
    Config {
        cache_size: 100,
        shard_count: 1,
        ttl: Duration::ZERO,
        enable_compression: true,
        ..Config::default()
    }
}

#[test]
fn test_large_payload_roundtrip_and_shrinks() {
    let cache = Cache::open(compressed_config());

    let original = vec![b'A'; 4096];
    assert!(cache.set("big", Value::Bytes(original.clone())));
    assert_eq!(cache.get("big"), Some(Value::Bytes(original)));

    // The stored physical size is the framed gzip stream, far below
    // the 4096 input bytes.
    let stats = cache.stats();
    assert!(stats.size > 0);
    assert!(stats.size < 4096, "stored {} bytes", stats.size);
}

#[test]
fn test_every_value_kind_roundtrips() {
    let cache = Cache::open(compressed_config());

    let mut map = BTreeMap::new();
    map.insert("active".to_string(), Value::Bool(true));
    map.insert("count".to_string(), Value::Uint(42));
    map.insert(
        "history".to_string(),
        Value::Seq(vec![Value::Int(-1), Value::Int(2)]),
    );

    let samples: Vec<(&str, Value)> = vec![
        ("bool", Value::Bool(true)),
        ("int", Value::Int(-123456789)),
        ("uint", Value::Uint(u64::MAX)),
        ("float", Value::Float(6.25)),
        ("str", Value::from("a string long enough to cross the compression threshold: aaaaaaaaaaaaaaaaaaaaaaaaaaaaa")),
        ("bytes", Value::Bytes((0..=255).collect())),
        ("seq", Value::Seq(vec![Value::from("x"), Value::Uint(1)])),
        ("map", Value::Map(map)),
    ];

    for (key, value) in &samples {
        assert!(cache.set(key, value.clone()), "set {}", key);
    }
    for (key, value) in &samples {
        assert_eq!(cache.get(key).as_ref(), Some(value), "get {}", key);
    }
}

#[test]
fn test_small_values_skip_gzip_but_roundtrip() {
    let cache = Cache::open(compressed_config());
    assert!(cache.set("tiny", Value::from("abc")));
    assert_eq!(cache.get("tiny"), Some(Value::from("abc")));

    // A three-byte string stays raw: header plus a handful of bytes.
    let stats = cache.stats();
    assert!(stats.size < 64);
}

#[test]
fn test_stored_nil_with_compression() {
    let cache = Cache::open(compressed_config());
    assert!(cache.set("n", Value::Nil));
    assert!(cache.set("e", Value::from("")));
    assert_eq!(cache.get("n"), Some(Value::Nil));
    assert_eq!(cache.get("e"), Some(Value::Str(String::new())));
}

#[test]
fn test_incompressible_data_still_roundtrips() {
    let cache = Cache::open(compressed_config());
    // Pseudo-random bytes barely compress; correctness must not depend
    // on the ratio.
    let mut noise = Vec::with_capacity(2048);
    let mut state = 0x9e3779b97f4a7c15u64;
    for _ in 0..2048 {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        noise.push((state >> 33) as u8);
    }
    assert!(cache.set("noise", Value::Bytes(noise.clone())));
    assert_eq!(cache.get("noise"), Some(Value::Bytes(noise)));
}
