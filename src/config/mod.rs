// Configuration loading and management.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::hash::next_pow2;

pub const DEFAULT_CACHE_SIZE: usize = 10_000;
pub const DEFAULT_SHARD_COUNT: usize = 32;
pub const PERF_SHARD_COUNT: usize = 128;
pub const MAX_SHARD_COUNT: usize = 1 << 30;
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(2 * 60);
pub const DEFAULT_ADMISSION_PROBABILITY: f64 = 0.5;

pub const POLICY_WTINYLFU: &str = "wtinylfu";
pub const POLICY_LRU: &str = "lru";

/// Caches below this capacity fall back to plain LRU when no policy is
/// named explicitly.
const LRU_CAPACITY_CUTOFF: usize = 1000;

/// AdmissionKind selects the facade's admission gate. The frequency
/// gate of the W-TinyLFU engine is separate and always runs when that
/// engine is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionKind {
    Always,
    Never,
    Probabilistic,
}

/// EvictionPolicy is the resolved engine selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    WTinyLfu,
    Lru,
}

/// Config is the single JSON object configuring a cache instance.
/// Durations are human-readable strings such as "15m" or "500ms".
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Total capacity across all shards, in entries.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    /// Number of shards; rounded up to the next power of two.
    #[serde(default = "default_shard_count")]
    pub shard_count: usize,
    /// Per-shard entry cap; zero derives cache_size / shard_count.
    #[serde(default)]
    pub max_shard_size: usize,
    /// Time-to-live for every entry; zero disables expiration.
    #[serde(default = "default_ttl", with = "humantime_serde")]
    pub ttl: Duration,
    /// Background sweeper period.
    #[serde(default = "default_cleanup_interval", with = "humantime_serde")]
    pub cleanup_interval: Duration,
    /// Gzip-compress payloads above the threshold.
    #[serde(default)]
    pub enable_compression: bool,
    /// "wtinylfu", "lru", or empty for the capacity-based default.
    #[serde(default = "default_eviction_policy")]
    pub eviction_policy: String,
    #[serde(default = "default_admission_policy")]
    pub admission_policy: AdmissionKind,
    /// Admit probability used by the probabilistic policy.
    #[serde(default = "default_admission_probability")]
    pub admission_probability: f64,
    /// Per-key byte limit; zero means unbounded.
    #[serde(default)]
    pub max_key_size: usize,
    /// Per-value byte limit; zero means unbounded.
    #[serde(default)]
    pub max_value_size: usize,
    /// Global kill switch.
    #[serde(default = "default_enable_caching")]
    pub enable_caching: bool,
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_shard_count() -> usize {
    DEFAULT_SHARD_COUNT
}

fn default_ttl() -> Duration {
    DEFAULT_TTL
}

fn default_cleanup_interval() -> Duration {
    DEFAULT_CLEANUP_INTERVAL
}

fn default_eviction_policy() -> String {
    POLICY_WTINYLFU.to_string()
}

fn default_admission_policy() -> AdmissionKind {
    AdmissionKind::Always
}

fn default_admission_probability() -> f64 {
    DEFAULT_ADMISSION_PROBABILITY
}

fn default_enable_caching() -> bool {
    true
}

impl Default for Config {
    /// The small preset: 10 000 entries over 32 shards with a ten
    /// minute TTL.
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            shard_count: DEFAULT_SHARD_COUNT,
            max_shard_size: 0,
            ttl: DEFAULT_TTL,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            enable_compression: false,
            eviction_policy: default_eviction_policy(),
            admission_policy: AdmissionKind::Always,
            admission_probability: DEFAULT_ADMISSION_PROBABILITY,
            max_key_size: 0,
            max_value_size: 0,
            enable_caching: true,
        }
    }
}

impl Config {
    /// The performance preset: 128 shards and no expiration.
    pub fn perf() -> Self {
        Self {
            shard_count: PERF_SHARD_COUNT,
            ttl: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Loads configuration from a JSON file.
    /// Malformed JSON or invalid duration strings fail the load; the
    /// caller may then fall back to defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let abs_path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve absolute config filepath: {:?}", path))?;

        let data = std::fs::read_to_string(&abs_path)
            .with_context(|| format!("read config json file {:?}", abs_path))?;

        let cfg: Config = serde_json::from_str(&data)
            .with_context(|| format!("unmarshal json from {:?}", abs_path))?;

        Ok(cfg.normalized())
    }

    /// Clamps degenerate values into the supported ranges instead of
    /// surfacing them as errors.
    pub fn normalized(mut self) -> Self {
        if self.cache_size == 0 {
            self.cache_size = DEFAULT_CACHE_SIZE;
        }
        self.shard_count = next_pow2(self.shard_count.clamp(1, MAX_SHARD_COUNT));
        if self.cleanup_interval.is_zero() {
            self.cleanup_interval = DEFAULT_CLEANUP_INTERVAL;
        }
        self
    }

    /// Resolves the engine selection. An empty policy string picks
    /// plain LRU for small caches and W-TinyLFU otherwise.
    pub fn resolved_policy(&self) -> EvictionPolicy {
        match self.eviction_policy.as_str() {
            POLICY_LRU => EvictionPolicy::Lru,
            "" if self.cache_size < LRU_CAPACITY_CUTOFF => EvictionPolicy::Lru,
            _ => EvictionPolicy::WTinyLfu,
        }
    }

    /// Per-shard entry capacity: the explicit cap when set, otherwise
    /// the total divided across shards.
    pub fn per_shard_capacity(&self) -> usize {
        if self.max_shard_size > 0 {
            return self.max_shard_size;
        }
        (self.cache_size / self.shard_count).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.cache_size, 10_000);
        assert_eq!(cfg.shard_count, 32);
        assert_eq!(cfg.ttl, Duration::from_secs(600));
        assert_eq!(cfg.cleanup_interval, Duration::from_secs(120));
        assert!(!cfg.enable_compression);
        assert_eq!(cfg.resolved_policy(), EvictionPolicy::WTinyLfu);
        assert_eq!(cfg.admission_policy, AdmissionKind::Always);
        assert!(cfg.enable_caching);
    }

    #[test]
    fn test_perf_preset() {
        let cfg = Config::perf();
        assert_eq!(cfg.shard_count, 128);
        assert!(cfg.ttl.is_zero());
    }

    #[test]
    fn test_json_with_durations() {
        let cfg: Config = serde_json::from_str(
            r#"{
                "cache_size": 5000,
                "shard_count": 16,
                "ttl": "15m",
                "cleanup_interval": "500ms",
                "enable_compression": true,
                "eviction_policy": "lru",
                "admission_policy": "probabilistic",
                "admission_probability": 0.25
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.cache_size, 5000);
        assert_eq!(cfg.ttl, Duration::from_secs(15 * 60));
        assert_eq!(cfg.cleanup_interval, Duration::from_millis(500));
        assert!(cfg.enable_compression);
        assert_eq!(cfg.resolved_policy(), EvictionPolicy::Lru);
        assert_eq!(cfg.admission_policy, AdmissionKind::Probabilistic);
        assert_eq!(cfg.admission_probability, 0.25);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.cache_size, DEFAULT_CACHE_SIZE);
        assert_eq!(cfg.shard_count, DEFAULT_SHARD_COUNT);
        assert_eq!(cfg.admission_probability, 0.5);
        assert_eq!(cfg.max_key_size, 0);
    }

    #[test]
    fn test_invalid_duration_fails() {
        let result = serde_json::from_str::<Config>(r#"{"ttl": "15 parsecs"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "wtcache-config-{}-{}.json",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::write(
            &path,
            r#"{"cache_size": 2048, "shard_count": 3, "ttl": "90s"}"#,
        )
        .unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.cache_size, 2048);
        // Loading normalizes: shard count rounds up to a power of two.
        assert_eq!(cfg.shard_count, 4);
        assert_eq!(cfg.ttl, Duration::from_secs(90));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(Config::load("/definitely/not/here.json").is_err());
    }

    #[test]
    fn test_load_malformed_json_fails() {
        let path = std::env::temp_dir().join(format!(
            "wtcache-bad-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "{not json").unwrap();
        assert!(Config::load(&path).is_err());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_normalization() {
        let cfg = Config {
            cache_size: 0,
            shard_count: 0,
            cleanup_interval: Duration::ZERO,
            ..Config::default()
        }
        .normalized();
        assert_eq!(cfg.cache_size, DEFAULT_CACHE_SIZE);
        assert_eq!(cfg.shard_count, 1);
        assert_eq!(cfg.cleanup_interval, DEFAULT_CLEANUP_INTERVAL);

        let cfg = Config {
            shard_count: 33,
            ..Config::default()
        }
        .normalized();
        assert_eq!(cfg.shard_count, 64);
    }

    #[test]
    fn test_empty_policy_resolves_by_capacity() {
        let small = Config {
            cache_size: 500,
            eviction_policy: String::new(),
            ..Config::default()
        };
        assert_eq!(small.resolved_policy(), EvictionPolicy::Lru);

        let large = Config {
            cache_size: 50_000,
            eviction_policy: String::new(),
            ..Config::default()
        };
        assert_eq!(large.resolved_policy(), EvictionPolicy::WTinyLfu);
    }

    #[test]
    fn test_per_shard_capacity() {
        let cfg = Config::default();
        assert_eq!(cfg.per_shard_capacity(), 10_000 / 32);

        let capped = Config {
            max_shard_size: 7,
            ..Config::default()
        };
        assert_eq!(capped.per_shard_capacity(), 7);
    }
}
