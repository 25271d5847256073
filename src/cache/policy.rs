//! Eviction Policy Module
//!
//! Chooses which entry to evict when a size-bounded cache is full.
//!
//! Every built-in policy breaks ties by picking the lexicographically
//! smallest key, and treats missing metadata as older than any recorded value.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::cache::metadata::EntryMetadata;
use crate::cache::{EntryKey, Timestamp};
use crate::error::CacheError;

/// Caller-supplied victim selection.
pub type CustomEvictionFn =
    Arc<dyn Fn(&EvictionCandidates<'_>) -> Option<EntryKey> + Send + Sync>;

// == Eviction Policy ==
/// Ordering used to pick a victim under size pressure.
#[derive(Clone)]
pub enum EvictionPolicy {
    /// Least recently used: smallest last-access time
    Lru,
    /// First in, first out: oldest creation time
    Fifo,
    /// Least frequently used: smallest access count
    Lfu,
    /// Victim chosen by a caller function
    Custom(CustomEvictionFn),
}

impl EvictionPolicy {
    /// Wraps a closure as a custom policy.
    pub fn custom<F>(select: F) -> Self
    where
        F: Fn(&EvictionCandidates<'_>) -> Option<EntryKey> + Send + Sync + 'static,
    {
        EvictionPolicy::Custom(Arc::new(select))
    }

    pub fn name(&self) -> &'static str {
        match self {
            EvictionPolicy::Lru => "lru",
            EvictionPolicy::Fifo => "fifo",
            EvictionPolicy::Lfu => "lfu",
            EvictionPolicy::Custom(_) => "custom",
        }
    }

    pub fn requires_creation_times(&self) -> bool {
        matches!(self, EvictionPolicy::Fifo)
    }

    pub fn requires_access_times(&self) -> bool {
        matches!(self, EvictionPolicy::Lru)
    }

    pub fn requires_access_counts(&self) -> bool {
        matches!(self, EvictionPolicy::Lfu)
    }

    // == Select ==
    /// Picks the next key to evict among `candidates`.
    ///
    /// Returns None when there are no candidates, or when a custom policy
    /// declines to choose.
    pub fn select(&self, candidates: &EvictionCandidates<'_>) -> Option<EntryKey> {
        let keys = candidates.keys();
        match self {
            EvictionPolicy::Lru => keys
                .iter()
                .min_by_key(|key| {
                    (
                        candidates.access_time(key).unwrap_or(Timestamp::EPOCH),
                        *key,
                    )
                })
                .cloned(),
            EvictionPolicy::Fifo => keys
                .iter()
                .min_by_key(|key| {
                    (
                        candidates.creation_time(key).unwrap_or(Timestamp::EPOCH),
                        *key,
                    )
                })
                .cloned(),
            EvictionPolicy::Lfu => keys
                .iter()
                .min_by_key(|key| (candidates.access_count(key).unwrap_or(0), *key))
                .cloned(),
            EvictionPolicy::Custom(select) => select(candidates),
        }
    }
}

impl fmt::Debug for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionPolicy::Custom(_) => f.write_str("Custom(<fn>)"),
            other => f.write_str(&other.name().to_uppercase()),
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EvictionPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            "fifo" => Ok(EvictionPolicy::Fifo),
            "lfu" => Ok(EvictionPolicy::Lfu),
            other => Err(CacheError::Configuration(format!(
                "unknown eviction policy: {}",
                other
            ))),
        }
    }
}

// == Eviction Candidates ==
/// Read-only view of the live keys and their bookkeeping.
pub struct EvictionCandidates<'a> {
    keys: &'a [EntryKey],
    metadata: &'a EntryMetadata,
}

impl<'a> EvictionCandidates<'a> {
    pub fn new(keys: &'a [EntryKey], metadata: &'a EntryMetadata) -> Self {
        Self { keys, metadata }
    }

    /// Keys that may be evicted.
    pub fn keys(&self) -> &'a [EntryKey] {
        self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &EntryKey) -> bool {
        self.keys.contains(key)
    }

    pub fn creation_time(&self, key: &EntryKey) -> Option<Timestamp> {
        self.metadata.creation_time(key)
    }

    pub fn access_time(&self, key: &EntryKey) -> Option<Timestamp> {
        self.metadata.access_time(key)
    }

    pub fn access_count(&self, key: &EntryKey) -> Option<u64> {
        self.metadata.access_count(key)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackingConfig;

    fn detailed_metadata() -> EntryMetadata {
        let tracking = TrackingConfig {
            detailed_stats: true,
            ..TrackingConfig::default()
        };
        EntryMetadata::resolve(&tracking, false, None).unwrap()
    }

    fn keys(names: &[&str]) -> Vec<EntryKey> {
        names.iter().map(|name| EntryKey::from(*name)).collect()
    }

    #[test]
    fn test_lru_picks_least_recent_access() {
        let mut metadata = detailed_metadata();
        let all = keys(&["a", "b", "c"]);
        for key in &all {
            metadata.record_save(key);
        }
        metadata.record_load(&all[0]);

        let candidates = EvictionCandidates::new(&all, &metadata);
        assert_eq!(EvictionPolicy::Lru.select(&candidates), Some(all[1].clone()));
    }

    #[test]
    fn test_fifo_ignores_access() {
        let mut metadata = detailed_metadata();
        let all = keys(&["a", "b", "c"]);
        for key in &all {
            metadata.record_save(key);
        }
        metadata.record_load(&all[0]);
        metadata.record_load(&all[0]);

        let candidates = EvictionCandidates::new(&all, &metadata);
        assert_eq!(EvictionPolicy::Fifo.select(&candidates), Some(all[0].clone()));
    }

    #[test]
    fn test_lfu_picks_least_frequent() {
        let mut metadata = detailed_metadata();
        let all = keys(&["a", "b", "c"]);
        for key in &all {
            metadata.record_save(key);
        }
        metadata.record_load(&all[0]);
        metadata.record_load(&all[2]);

        let candidates = EvictionCandidates::new(&all, &metadata);
        assert_eq!(EvictionPolicy::Lfu.select(&candidates), Some(all[1].clone()));
    }

    #[test]
    fn test_lfu_tie_breaks_on_smallest_key() {
        let mut metadata = detailed_metadata();
        let all = keys(&["zeta", "alpha", "mid"]);
        for key in &all {
            metadata.record_save(key);
        }

        let candidates = EvictionCandidates::new(&all, &metadata);
        assert_eq!(
            EvictionPolicy::Lfu.select(&candidates),
            Some(EntryKey::from("alpha"))
        );
    }

    #[test]
    fn test_missing_metadata_evicted_first() {
        let mut metadata = detailed_metadata();
        let all = keys(&["a", "b"]);
        metadata.record_save(&all[0]);

        let candidates = EvictionCandidates::new(&all, &metadata);
        assert_eq!(EvictionPolicy::Lru.select(&candidates), Some(all[1].clone()));
    }

    #[test]
    fn test_empty_candidates() {
        let metadata = detailed_metadata();
        let candidates = EvictionCandidates::new(&[], &metadata);
        assert!(candidates.is_empty());
        assert_eq!(EvictionPolicy::Lru.select(&candidates), None);
    }

    #[test]
    fn test_custom_policy() {
        let metadata = detailed_metadata();
        let all = keys(&["a", "b", "c"]);
        let policy = EvictionPolicy::custom(|candidates| candidates.keys().last().cloned());

        let candidates = EvictionCandidates::new(&all, &metadata);
        assert_eq!(policy.select(&candidates), Some(all[2].clone()));
        assert_eq!(policy.name(), "custom");
    }

    #[test]
    fn test_parse_policy() {
        assert!(matches!("LRU".parse::<EvictionPolicy>(), Ok(EvictionPolicy::Lru)));
        assert!(matches!(" fifo ".parse::<EvictionPolicy>(), Ok(EvictionPolicy::Fifo)));
        assert!(matches!("lfu".parse::<EvictionPolicy>(), Ok(EvictionPolicy::Lfu)));
        assert!(matches!(
            "random".parse::<EvictionPolicy>(),
            Err(CacheError::Configuration(_))
        ));
    }
}
