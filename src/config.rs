//! Configuration Module
//!
//! Builds cache engines from code or from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{CacheEngine, CacheValue, EntryKey, EvictionCandidates, EvictionPolicy, SharedCache};
use crate::error::Result;
use crate::key::{CallArgs, HashConfig, HashMode, Signature};
use crate::storage::{Backend, BackendKind, FileFormat, StorageAdapter};

// == Tracking Config ==
/// Which statistics and per-entry tables to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingConfig {
    /// Keep the usage counters
    pub basic_stats: bool,
    /// Keep every per-entry table unless overridden below
    pub detailed_stats: bool,
    pub creation_times: Option<bool>,
    pub access_times: Option<bool>,
    pub access_counts: Option<bool>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            basic_stats: true,
            detailed_stats: false,
            creation_times: None,
            access_times: None,
            access_counts: None,
        }
    }
}

// == Cache Config ==
/// Construction parameters of a cache engine.
///
/// Everything defaults to an unbounded in-memory cache without expiry.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Diagnostic name; a random one is generated when unset
    pub name: Option<String>,
    /// Maximum entry age before it is treated as absent
    pub ttl: Option<Duration>,
    /// Maximum number of live entries
    pub max_size: Option<usize>,
    /// Victim selection under size pressure; LRU when `max_size` is set
    pub policy: Option<EvictionPolicy>,
    pub tracking: TrackingConfig,
    pub hashing: HashConfig,
    pub backend: BackendKind,
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMO_CACHE_NAME` - Cache name (default: random)
    /// - `MEMO_CACHE_TTL` - Entry lifetime, e.g. `30`, `90s`, `15m`, `2h`, `1d`, `1w` (default: none)
    /// - `MEMO_CACHE_MAX_SIZE` - Maximum live entries (default: unbounded)
    /// - `MEMO_CACHE_POLICY` - `lru`, `fifo` or `lfu` (default: lru when bounded)
    /// - `MEMO_CACHE_DIR` - Store entries as files in this directory (default: in memory)
    /// - `MEMO_CACHE_FORMAT` - `bincode` or `json` file format (default: bincode)
    /// - `MEMO_CACHE_BASIC_STATS` - Keep usage counters (default: true)
    /// - `MEMO_CACHE_DETAILED_STATS` - Keep per-entry tables (default: false)
    ///
    /// Values that fail to parse fall back to their default.
    pub fn from_env() -> Self {
        let defaults = TrackingConfig::default();
        let format = env::var("MEMO_CACHE_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(FileFormat::Bincode);
        let backend = match env::var("MEMO_CACHE_DIR") {
            Ok(dir) if !dir.trim().is_empty() => BackendKind::Disk {
                dir: Some(PathBuf::from(dir)),
                format,
            },
            _ => BackendKind::Memory,
        };

        Self {
            name: env::var("MEMO_CACHE_NAME").ok().filter(|v| !v.trim().is_empty()),
            ttl: env::var("MEMO_CACHE_TTL")
                .ok()
                .and_then(|v| parse_duration(&v)),
            max_size: env::var("MEMO_CACHE_MAX_SIZE")
                .ok()
                .and_then(|v| v.trim().parse().ok()),
            policy: env::var("MEMO_CACHE_POLICY")
                .ok()
                .and_then(|v| v.parse().ok()),
            tracking: TrackingConfig {
                basic_stats: env::var("MEMO_CACHE_BASIC_STATS")
                    .ok()
                    .and_then(|v| parse_flag(&v))
                    .unwrap_or(defaults.basic_stats),
                detailed_stats: env::var("MEMO_CACHE_DETAILED_STATS")
                    .ok()
                    .and_then(|v| parse_flag(&v))
                    .unwrap_or(defaults.detailed_stats),
                ..defaults
            },
            hashing: HashConfig::default(),
            backend,
        }
    }

    // == Builder ==
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn with_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Uses a caller function to pick eviction victims.
    pub fn with_custom_policy<F>(self, select: F) -> Self
    where
        F: Fn(&EvictionCandidates<'_>) -> Option<EntryKey> + Send + Sync + 'static,
    {
        self.with_policy(EvictionPolicy::custom(select))
    }

    pub fn with_tracking(mut self, tracking: TrackingConfig) -> Self {
        self.tracking = tracking;
        self
    }

    pub fn with_basic_stats(mut self, enabled: bool) -> Self {
        self.tracking.basic_stats = enabled;
        self
    }

    pub fn with_detailed_stats(mut self, enabled: bool) -> Self {
        self.tracking.detailed_stats = enabled;
        self
    }

    pub fn with_hashing(mut self, hashing: HashConfig) -> Self {
        self.hashing = hashing;
        self
    }

    pub fn with_hash_mode(mut self, mode: HashMode) -> Self {
        self.hashing.mode = Some(mode);
        self
    }

    /// Derives keys with a caller function instead of a hash mode.
    pub fn with_key_fn<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&CallArgs) -> Result<EntryKey> + Send + Sync + 'static,
    {
        self.hashing.key_fn = Some(std::sync::Arc::new(key_fn));
        self
    }

    /// Resolves call arguments against `signature` before hashing.
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.hashing.signature = Some(signature);
        if self.hashing.normalize.is_none() {
            self.hashing.normalize = Some(true);
        }
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.hashing.normalize = Some(normalize);
        self
    }

    pub fn with_include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hashing.include = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hashing.exclude = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Stores entries as files in `dir` using `format`.
    pub fn with_disk(self, dir: impl Into<PathBuf>, format: FileFormat) -> Self {
        self.with_backend(BackendKind::Disk {
            dir: Some(dir.into()),
            format,
        })
    }

    // == Build ==
    /// Opens the configured backend and builds a single-owner engine.
    pub fn build<V: CacheValue>(&self) -> Result<CacheEngine<V>> {
        CacheEngine::new(self, Backend::open(&self.backend)?)
    }

    /// Builds an engine on top of a caller-supplied adapter, ignoring `backend`.
    pub fn build_with_storage<V: CacheValue>(
        &self,
        storage: Box<dyn StorageAdapter<V>>,
    ) -> Result<CacheEngine<V>> {
        CacheEngine::new(self, Backend::Custom(storage))
    }

    /// Builds an engine behind a lock, shareable across threads.
    pub fn build_shared<V: CacheValue>(&self) -> Result<SharedCache<V>> {
        Ok(SharedCache::new(self.build()?))
    }
}

// == Parsing Helpers ==
/// Parses `"30"`, `"90s"`, `"15m"`, `"2h"`, `"1d"` or `"1w"`.
///
/// A bare number is seconds. Returns None for anything else.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let amount: u64 = number.parse().ok()?;
    let seconds = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        "w" => 7 * 24 * 60 * 60,
        _ => return None,
    };
    amount.checked_mul(seconds).map(Duration::from_secs)
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
