//! Entry Metadata Module
//!
//! Per-entry creation times, access times and access counts, each table
//! optional and switched on by configuration or by what TTL and the eviction
//! policy need.

use std::collections::HashMap;

use crate::cache::entry::MonotonicClock;
use crate::cache::policy::EvictionPolicy;
use crate::cache::{EntryKey, Timestamp};
use crate::config::TrackingConfig;
use crate::error::{CacheError, Result};

// == Entry Metadata ==
/// Bookkeeping tables keyed by entry key.
#[derive(Debug)]
pub struct EntryMetadata {
    creation_times: Option<HashMap<EntryKey, Timestamp>>,
    access_times: Option<HashMap<EntryKey, Timestamp>>,
    access_counts: Option<HashMap<EntryKey, u64>>,
    clock: MonotonicClock,
}

impl EntryMetadata {
    // == Constructor ==
    /// Decides which tables to keep.
    ///
    /// Tables that TTL or the policy depend on are switched on unless the
    /// configuration explicitly disables them, which is an error.
    pub fn resolve(
        tracking: &TrackingConfig,
        uses_ttl: bool,
        policy: Option<&EvictionPolicy>,
    ) -> Result<Self> {
        let fifo = policy.is_some_and(|p| p.requires_creation_times());
        let lru = policy.is_some_and(|p| p.requires_access_times());
        let lfu = policy.is_some_and(|p| p.requires_access_counts());

        let creation_reason = if uses_ttl {
            Some("ttl")
        } else if fifo {
            Some("fifo eviction")
        } else {
            None
        };
        let track_creation = resolve_flag(
            tracking.creation_times,
            creation_reason,
            tracking.detailed_stats,
            "creation times",
        )?;
        let track_access = resolve_flag(
            tracking.access_times,
            lru.then_some("lru eviction"),
            tracking.detailed_stats,
            "access times",
        )?;
        let track_counts = resolve_flag(
            tracking.access_counts,
            lfu.then_some("lfu eviction"),
            tracking.detailed_stats,
            "access counts",
        )?;

        Ok(Self {
            creation_times: track_creation.then(HashMap::new),
            access_times: track_access.then(HashMap::new),
            access_counts: track_counts.then(HashMap::new),
            clock: MonotonicClock::new(),
        })
    }

    pub fn tracks_creation_times(&self) -> bool {
        self.creation_times.is_some()
    }

    pub fn tracks_access_times(&self) -> bool {
        self.access_times.is_some()
    }

    pub fn tracks_access_counts(&self) -> bool {
        self.access_counts.is_some()
    }

    /// Next timestamp from the metadata clock.
    pub fn now(&mut self) -> Timestamp {
        self.clock.stamp()
    }

    // == Record Save ==
    /// Updates tables after a value was written.
    ///
    /// Creation time is only set the first time a key is written; an
    /// overwrite keeps the original.
    pub fn record_save(&mut self, key: &EntryKey) {
        let now = self.clock.stamp();
        if let Some(times) = self.creation_times.as_mut() {
            times.entry(key.clone()).or_insert(now);
        }
        if let Some(times) = self.access_times.as_mut() {
            times.insert(key.clone(), now);
        }
        if let Some(counts) = self.access_counts.as_mut() {
            counts.entry(key.clone()).or_insert(0);
        }
    }

    // == Record Load ==
    /// Updates tables after a value was read.
    pub fn record_load(&mut self, key: &EntryKey) {
        let now = self.clock.stamp();
        if let Some(times) = self.access_times.as_mut() {
            times.insert(key.clone(), now);
        }
        if let Some(counts) = self.access_counts.as_mut() {
            *counts.entry(key.clone()).or_insert(0) += 1;
        }
    }

    // == Seed ==
    /// Registers an entry found in storage that this instance never wrote.
    ///
    /// Missing timestamps default to now.
    pub fn seed(&mut self, key: &EntryKey, created: Option<Timestamp>, accessed: Option<Timestamp>) {
        for seen in [created, accessed].into_iter().flatten() {
            self.clock.observe(seen);
        }
        let now = Timestamp::now();
        let created = created.unwrap_or(now);
        if let Some(times) = self.creation_times.as_mut() {
            times.entry(key.clone()).or_insert(created);
        }
        if let Some(times) = self.access_times.as_mut() {
            times.entry(key.clone()).or_insert(accessed.unwrap_or(created));
        }
        if let Some(counts) = self.access_counts.as_mut() {
            counts.entry(key.clone()).or_insert(0);
        }
    }

    /// Drops every table row for `key`.
    pub fn forget(&mut self, key: &EntryKey) {
        if let Some(times) = self.creation_times.as_mut() {
            times.remove(key);
        }
        if let Some(times) = self.access_times.as_mut() {
            times.remove(key);
        }
        if let Some(counts) = self.access_counts.as_mut() {
            counts.remove(key);
        }
    }

    pub fn clear(&mut self) {
        if let Some(times) = self.creation_times.as_mut() {
            times.clear();
        }
        if let Some(times) = self.access_times.as_mut() {
            times.clear();
        }
        if let Some(counts) = self.access_counts.as_mut() {
            counts.clear();
        }
    }

    /// Whether the tracked tables already hold a row for `key`.
    ///
    /// Always true when nothing is tracked.
    pub fn knows(&self, key: &EntryKey) -> bool {
        if let Some(times) = self.creation_times.as_ref() {
            return times.contains_key(key);
        }
        if let Some(times) = self.access_times.as_ref() {
            return times.contains_key(key);
        }
        if let Some(counts) = self.access_counts.as_ref() {
            return counts.contains_key(key);
        }
        true
    }

    pub fn creation_time(&self, key: &EntryKey) -> Option<Timestamp> {
        self.creation_times.as_ref()?.get(key).copied()
    }

    pub fn access_time(&self, key: &EntryKey) -> Option<Timestamp> {
        self.access_times.as_ref()?.get(key).copied()
    }

    pub fn access_count(&self, key: &EntryKey) -> Option<u64> {
        self.access_counts.as_ref()?.get(key).copied()
    }

    // == Table Accessors ==
    /// Full creation-time table, or an error if it is not tracked.
    pub fn creation_times(&self) -> Result<&HashMap<EntryKey, Timestamp>> {
        self.creation_times
            .as_ref()
            .ok_or_else(|| not_tracked("creation times"))
    }

    pub fn access_times(&self) -> Result<&HashMap<EntryKey, Timestamp>> {
        self.access_times
            .as_ref()
            .ok_or_else(|| not_tracked("access times"))
    }

    pub fn access_counts(&self) -> Result<&HashMap<EntryKey, u64>> {
        self.access_counts
            .as_ref()
            .ok_or_else(|| not_tracked("access counts"))
    }

    /// Row counts of the tracked tables, None for untracked ones.
    pub fn table_sizes(&self) -> (Option<usize>, Option<usize>, Option<usize>) {
        (
            self.creation_times.as_ref().map(HashMap::len),
            self.access_times.as_ref().map(HashMap::len),
            self.access_counts.as_ref().map(HashMap::len),
        )
    }
}

fn resolve_flag(
    explicit: Option<bool>,
    required_by: Option<&str>,
    detailed: bool,
    table: &str,
) -> Result<bool> {
    match (explicit, required_by) {
        (Some(false), Some(reason)) => Err(CacheError::Configuration(format!(
            "{} must be tracked when using {}",
            table, reason
        ))),
        (Some(flag), _) => Ok(flag),
        (None, required_by) => Ok(required_by.is_some() || detailed),
    }
}

pub(crate) fn not_tracked(table: &str) -> CacheError {
    CacheError::Configuration(format!("{} are not being tracked", table))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn tracking() -> TrackingConfig {
        TrackingConfig::default()
    }

    #[test]
    fn test_defaults_track_nothing() {
        let metadata = EntryMetadata::resolve(&tracking(), false, None).unwrap();
        assert!(!metadata.tracks_creation_times());
        assert!(!metadata.tracks_access_times());
        assert!(!metadata.tracks_access_counts());
        assert!(metadata.creation_times().is_err());
    }

    #[test]
    fn test_detailed_enables_all() {
        let config = TrackingConfig {
            detailed_stats: true,
            ..tracking()
        };
        let metadata = EntryMetadata::resolve(&config, false, None).unwrap();
        assert!(metadata.tracks_creation_times());
        assert!(metadata.tracks_access_times());
        assert!(metadata.tracks_access_counts());
    }

    #[test]
    fn test_detailed_with_override() {
        let config = TrackingConfig {
            detailed_stats: true,
            access_counts: Some(false),
            ..tracking()
        };
        let metadata = EntryMetadata::resolve(&config, false, None).unwrap();
        assert!(metadata.tracks_access_times());
        assert!(!metadata.tracks_access_counts());
    }

    #[test]
    fn test_policies_force_their_tables() {
        let lru = EntryMetadata::resolve(&tracking(), false, Some(&EvictionPolicy::Lru)).unwrap();
        assert!(lru.tracks_access_times());
        assert!(!lru.tracks_access_counts());

        let lfu = EntryMetadata::resolve(&tracking(), false, Some(&EvictionPolicy::Lfu)).unwrap();
        assert!(lfu.tracks_access_counts());

        let fifo =
            EntryMetadata::resolve(&tracking(), false, Some(&EvictionPolicy::Fifo)).unwrap();
        assert!(fifo.tracks_creation_times());

        let ttl = EntryMetadata::resolve(&tracking(), true, None).unwrap();
        assert!(ttl.tracks_creation_times());
    }

    #[test]
    fn test_disabling_required_table_fails() {
        let no_access = TrackingConfig {
            access_times: Some(false),
            ..tracking()
        };
        let result = EntryMetadata::resolve(&no_access, false, Some(&EvictionPolicy::Lru));
        assert!(matches!(result, Err(CacheError::Configuration(_))));

        let no_creation = TrackingConfig {
            creation_times: Some(false),
            ..tracking()
        };
        assert!(EntryMetadata::resolve(&no_creation, true, None).is_err());
        assert!(EntryMetadata::resolve(&no_creation, false, Some(&EvictionPolicy::Fifo)).is_err());

        let no_counts = TrackingConfig {
            access_counts: Some(false),
            ..tracking()
        };
        assert!(EntryMetadata::resolve(&no_counts, false, Some(&EvictionPolicy::Lfu)).is_err());
    }

    #[test]
    fn test_save_keeps_creation_time() {
        let config = TrackingConfig {
            detailed_stats: true,
            ..tracking()
        };
        let mut metadata = EntryMetadata::resolve(&config, false, None).unwrap();
        let key = EntryKey::from("k");

        metadata.record_save(&key);
        let created = metadata.creation_time(&key).unwrap();
        let first_access = metadata.access_time(&key).unwrap();

        metadata.record_save(&key);
        assert_eq!(metadata.creation_time(&key), Some(created));
        assert!(metadata.access_time(&key).unwrap() > first_access);
        assert_eq!(metadata.access_count(&key), Some(0));

        metadata.record_load(&key);
        metadata.record_load(&key);
        assert_eq!(metadata.access_count(&key), Some(2));

        metadata.forget(&key);
        assert_eq!(metadata.creation_time(&key), None);
        assert_eq!(metadata.table_sizes(), (Some(0), Some(0), Some(0)));
    }

    #[test]
    fn test_seed_uses_given_times() {
        let config = TrackingConfig {
            detailed_stats: true,
            ..tracking()
        };
        let mut metadata = EntryMetadata::resolve(&config, false, None).unwrap();
        let key = EntryKey::from("k");
        let created = Timestamp::from_nanos(1_000);

        metadata.seed(&key, Some(created), None);
        assert_eq!(metadata.creation_time(&key), Some(created));
        assert_eq!(metadata.access_time(&key), Some(created));
        assert_eq!(metadata.access_count(&key), Some(0));
    }
}
