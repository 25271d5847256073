//! Cache Engine Module
//!
//! Ties key derivation, storage, eviction and statistics together.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{
    CacheStats, CacheValue, EntryKey, EntryMetadata, EvictionCandidates, EvictionPolicy, Lookup,
    Timestamp,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::key::{CallArgs, KeyDeriver};
use crate::models::CacheSummary;
use crate::storage::{Backend, StorageAdapter};

// == Call Options ==
/// Per-call switches for `get_or_compute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOptions {
    /// Return a cached value when one is live
    pub load: bool,
    /// Store a freshly computed value
    pub save: bool,
}

impl CallOptions {
    /// Load and save both enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Always compute, but still store the result.
    pub fn refresh() -> Self {
        Self {
            load: false,
            save: true,
        }
    }

    /// Bypass the cache entirely.
    pub fn bypass() -> Self {
        Self {
            load: false,
            save: false,
        }
    }

    /// False when the call neither reads nor writes the cache.
    pub fn uses_cache(&self) -> bool {
        self.load || self.save
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            load: true,
            save: true,
        }
    }
}

// == Cache Engine ==
/// Memoization cache over a storage backend.
///
/// Operations take `&mut self`; wrap in a [`SharedCache`](crate::cache::SharedCache)
/// to share between threads.
pub struct CacheEngine<V: CacheValue> {
    name: String,
    storage: Backend<V>,
    deriver: KeyDeriver,
    ttl: Option<Duration>,
    max_size: Option<usize>,
    policy: Option<EvictionPolicy>,
    stats: Option<CacheStats>,
    metadata: EntryMetadata,
}

impl<V: CacheValue> CacheEngine<V> {
    // == Constructor ==
    /// Validates `config` and builds an engine over `storage`.
    ///
    /// Entries already present in the storage are registered with the
    /// timestamps the medium reports for them.
    pub fn new(config: &CacheConfig, storage: Backend<V>) -> Result<Self> {
        if config.max_size == Some(0) {
            return Err(CacheError::Configuration(
                "max_size must be greater than 0".to_string(),
            ));
        }
        if config.ttl == Some(Duration::ZERO) {
            return Err(CacheError::Configuration(
                "ttl must be greater than 0".to_string(),
            ));
        }
        let policy = match (config.max_size, &config.policy) {
            (None, Some(policy)) => {
                return Err(CacheError::Configuration(format!(
                    "eviction policy {} requires max_size",
                    policy
                )))
            }
            (None, None) => None,
            (Some(_), policy) => Some(policy.clone().unwrap_or(EvictionPolicy::Lru)),
        };

        let metadata = EntryMetadata::resolve(&config.tracking, config.ttl.is_some(), policy.as_ref())?;
        let deriver = KeyDeriver::from_config(&config.hashing, storage.prefers_fixed_length_keys())?;
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| format!("cache-{}", Uuid::new_v4()));

        let mut engine = Self {
            name,
            storage,
            deriver,
            ttl: config.ttl,
            max_size: config.max_size,
            policy,
            stats: config.tracking.basic_stats.then(CacheStats::new),
            metadata,
        };

        let existing = engine.storage.list_all()?;
        for key in &existing {
            engine.adopt(key)?;
        }

        info!(
            "Cache '{}' ready: backend={}, keys={}, ttl={:?}, max_size={:?}, policy={}, existing={}",
            engine.name,
            engine.storage.name(),
            engine.deriver.mode_name(),
            engine.ttl,
            engine.max_size,
            engine.policy.as_ref().map_or("none", EvictionPolicy::name),
            existing.len()
        );
        Ok(engine)
    }

    // == Name ==
    /// Instance name used in logs and summaries.
    pub fn name(&self) -> &str {
        &self.name
    }

    // == Limits ==
    /// Maximum entry age, if any.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Maximum number of live entries, if bounded.
    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    /// Eviction policy; always set when `max_size` is.
    pub fn policy(&self) -> Option<&EvictionPolicy> {
        self.policy.as_ref()
    }

    // == Stats ==
    /// Usage counters, None when basic statistics are disabled.
    pub fn stats(&self) -> Option<&CacheStats> {
        self.stats.as_ref()
    }

    // == Deriver ==
    /// Key deriver built from the hashing options.
    pub fn deriver(&self) -> &KeyDeriver {
        &self.deriver
    }

    // == Storage ==
    /// The storage backend this cache writes to.
    pub fn storage(&self) -> &Backend<V> {
        &self.storage
    }

    // == Derive Key ==
    /// Derives the entry key for a call and counts it.
    pub fn derive_key(&mut self, args: &CallArgs) -> Result<EntryKey> {
        let key = self.deriver.derive(args)?;
        if let Some(stats) = self.stats.as_mut() {
            stats.record_hash();
        }
        Ok(key)
    }

    // == Exists ==
    /// Whether a live entry is stored under `key`.
    ///
    /// Expired entries are deleted on the way.
    pub fn exists(&mut self, key: &EntryKey) -> Result<bool> {
        let live = self.is_live(key)?;
        if let Some(stats) = self.stats.as_mut() {
            stats.record_check(live);
        }
        debug!("Check '{}' in {}: {}", key, self.name, if live { "hit" } else { "miss" });
        Ok(live)
    }

    /// `exists` on the key derived from `args`.
    pub fn exists_for(&mut self, args: &CallArgs) -> Result<bool> {
        let key = self.derive_key(args)?;
        self.exists(&key)
    }

    // == Load ==
    /// Reads the value stored under `key`.
    ///
    /// A missing or expired entry is `Lookup::Miss`, or `NotFound` when
    /// `must_exist` is set.
    pub fn load(&mut self, key: &EntryKey, must_exist: bool) -> Result<Lookup<V>> {
        if !self.is_live(key)? {
            if must_exist {
                return Err(CacheError::NotFound(key.to_string()));
            }
            return Ok(Lookup::Miss);
        }

        let value = self.storage.load(key)?;
        self.metadata.record_load(key);
        if let Some(stats) = self.stats.as_mut() {
            stats.record_load();
        }
        Ok(Lookup::Hit(value))
    }

    /// `load` on the key derived from `args`.
    pub fn load_for(&mut self, args: &CallArgs, must_exist: bool) -> Result<Lookup<V>> {
        let key = self.derive_key(args)?;
        self.load(&key, must_exist)
    }

    // == Save ==
    /// Stores `value` under `key`.
    ///
    /// Saving a key that is not live into a full cache evicts entries first.
    /// Overwriting a live key keeps its creation time.
    pub fn save(&mut self, key: &EntryKey, value: &V) -> Result<()> {
        let live = self.is_live(key)?;
        if !live {
            self.metadata.forget(key);
            if let Some(max_size) = self.max_size {
                self.evict_to_size(max_size - 1)?;
            }
        }

        self.storage.save(key, value)?;
        self.metadata.record_save(key);
        if let Some(stats) = self.stats.as_mut() {
            stats.record_save();
        }
        debug!("Saved '{}' in {}", key, self.name);
        Ok(())
    }

    /// Saves under the key derived from `args` and returns that key.
    pub fn save_for(&mut self, args: &CallArgs, value: &V) -> Result<EntryKey> {
        let key = self.derive_key(args)?;
        self.save(&key, value)?;
        Ok(key)
    }

    // == Delete ==
    /// Removes the entry under `key`, if any.
    pub fn delete(&mut self, key: &EntryKey) -> Result<()> {
        self.remove(key)?;
        debug!("Deleted '{}' from {}", key, self.name);
        Ok(())
    }

    /// `delete` on the key derived from `args`.
    pub fn delete_for(&mut self, args: &CallArgs) -> Result<()> {
        let key = self.derive_key(args)?;
        self.delete(&key)
    }

    // == Delete All ==
    /// Removes every entry. Counts one delete per live entry.
    pub fn delete_all(&mut self) -> Result<()> {
        let live = self.size()?;
        self.storage.clear()?;
        self.metadata.clear();
        if let Some(stats) = self.stats.as_mut() {
            stats.record_deletes(live as u64);
        }
        info!("Cleared {} entries from {}", live, self.name);
        Ok(())
    }

    // == Size ==
    /// Number of live entries. Expired entries are deleted on the way.
    pub fn size(&mut self) -> Result<usize> {
        Ok(self.live_keys()?.len())
    }

    /// Live keys in ascending order.
    pub fn keys(&mut self) -> Result<Vec<EntryKey>> {
        self.live_keys()
    }

    // == Evict To Size ==
    /// Evicts entries chosen by the policy until at most `target` remain.
    ///
    /// Returns the number of evicted entries.
    pub fn evict_to_size(&mut self, target: usize) -> Result<usize> {
        let Some(policy) = self.policy.clone() else {
            return Err(CacheError::Configuration(
                "no eviction policy configured".to_string(),
            ));
        };

        let mut live = self.live_keys()?;
        let mut evicted = 0;
        while live.len() > target {
            let victim = policy.select(&EvictionCandidates::new(&live, &self.metadata));
            let victim = match victim {
                Some(key) if live.contains(&key) => key,
                Some(key) => {
                    warn!("Eviction policy picked '{}', which is not a live entry", key);
                    return Err(CacheError::Configuration(format!(
                        "eviction policy picked unknown entry {}",
                        key
                    )));
                }
                None => {
                    return Err(CacheError::Configuration(
                        "eviction policy picked no entry".to_string(),
                    ))
                }
            };

            self.remove(&victim)?;
            if let Some(stats) = self.stats.as_mut() {
                stats.record_size_eviction();
            }
            debug!("Evicted '{}' from {} ({})", victim, self.name, policy);
            live.retain(|key| key != &victim);
            evicted += 1;
        }
        Ok(evicted)
    }

    // == Get Or Compute ==
    /// Returns the cached result for `args`, or computes and stores it.
    pub fn get_or_compute<F>(&mut self, args: &CallArgs, options: CallOptions, compute: F) -> Result<V>
    where
        F: FnOnce(&CallArgs) -> V,
    {
        self.get_or_try_compute(args, options, |args| Ok::<V, CacheError>(compute(args)))
    }

    /// Like `get_or_compute` for fallible computations. Errors are never stored.
    pub fn get_or_try_compute<F, E>(
        &mut self,
        args: &CallArgs,
        options: CallOptions,
        compute: F,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce(&CallArgs) -> std::result::Result<V, E>,
        E: From<CacheError>,
    {
        let key = if options.uses_cache() {
            Some(self.derive_key(args)?)
        } else {
            None
        };

        if let (Some(key), true) = (&key, options.load) {
            if let Some(value) = self.lookup(key)? {
                return Ok(value);
            }
        }

        let value = compute(args)?;
        if let (Some(key), true) = (&key, options.save) {
            self.save(key, &value)?;
        }
        Ok(value)
    }

    /// Counted existence check followed by a load on hit.
    pub(crate) fn lookup(&mut self, key: &EntryKey) -> Result<Option<V>> {
        if !self.exists(key)? {
            return Ok(None);
        }
        Ok(self.load(key, false)?.into_option())
    }

    // == Entry Metadata ==
    /// Creation time of `key`; errors when creation times are not tracked.
    pub fn creation_time(&self, key: &EntryKey) -> Result<Option<Timestamp>> {
        Ok(self.metadata.creation_times()?.get(key).copied())
    }

    /// Last access time of `key`.
    pub fn access_time(&self, key: &EntryKey) -> Result<Option<Timestamp>> {
        Ok(self.metadata.access_times()?.get(key).copied())
    }

    /// Number of loads of `key` since it was first saved.
    pub fn access_count(&self, key: &EntryKey) -> Result<Option<u64>> {
        Ok(self.metadata.access_counts()?.get(key).copied())
    }

    /// Time since `key` was first saved.
    pub fn entry_age(&self, key: &EntryKey) -> Result<Option<Duration>> {
        Ok(self
            .creation_time(key)?
            .map(|created| created.age_at(Timestamp::now())))
    }

    /// All creation times, restricted to live entries when `live_only` is set.
    pub fn creation_times(&mut self, live_only: bool) -> Result<BTreeMap<EntryKey, Timestamp>> {
        self.metadata.creation_times()?;
        let live = self.live_filter(live_only)?;
        Ok(snapshot(self.metadata.creation_times()?, live.as_deref()))
    }

    /// All access times, filtered like `creation_times`.
    pub fn access_times(&mut self, live_only: bool) -> Result<BTreeMap<EntryKey, Timestamp>> {
        self.metadata.access_times()?;
        let live = self.live_filter(live_only)?;
        Ok(snapshot(self.metadata.access_times()?, live.as_deref()))
    }

    pub fn access_counts(&mut self, live_only: bool) -> Result<BTreeMap<EntryKey, u64>> {
        self.metadata.access_counts()?;
        let live = self.live_filter(live_only)?;
        Ok(snapshot(self.metadata.access_counts()?, live.as_deref()))
    }

    // == Summary ==
    /// Point-in-time report of configuration, size and counters.
    pub fn summary(&mut self) -> Result<CacheSummary> {
        let entries = self.size()?;
        let (creation_times, access_times, access_counts) = self.metadata.table_sizes();
        Ok(CacheSummary {
            name: self.name.clone(),
            backend: self.storage.name().to_string(),
            key_mode: self.deriver.mode_name().to_string(),
            entries,
            ttl_secs: self.ttl.map(|ttl| ttl.as_secs_f64()),
            max_size: self.max_size,
            policy: self.policy.as_ref().map(|policy| policy.name().to_string()),
            hit_rate: self.stats.as_ref().map(CacheStats::hit_rate),
            stats: self.stats.clone(),
            tracked_creation_times: creation_times,
            tracked_access_times: access_times,
            tracked_access_counts: access_counts,
            generated_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    // == Internals ==
    /// Storage existence plus TTL check; deletes the entry if it expired.
    fn is_live(&mut self, key: &EntryKey) -> Result<bool> {
        if !self.storage.exists(key)? {
            return Ok(false);
        }
        if !self.metadata.knows(key) {
            self.adopt(key)?;
        }
        Ok(!self.too_old(key)?)
    }

    fn too_old(&mut self, key: &EntryKey) -> Result<bool> {
        let Some(ttl) = self.ttl else {
            return Ok(false);
        };
        let Some(created) = self.metadata.creation_time(key) else {
            return Ok(false);
        };
        if created.age_at(Timestamp::now()) < ttl {
            return Ok(false);
        }

        self.remove(key)?;
        if let Some(stats) = self.stats.as_mut() {
            stats.record_ttl_eviction();
        }
        debug!("Expired '{}' from {}", key, self.name);
        Ok(true)
    }

    /// Registers an entry written outside this instance.
    fn adopt(&mut self, key: &EntryKey) -> Result<()> {
        let created = self.storage.created_at(key)?;
        let accessed = self.storage.accessed_at(key)?;
        self.metadata.seed(key, created, accessed);
        Ok(())
    }

    /// Storage and metadata removal shared by deletes and evictions.
    fn remove(&mut self, key: &EntryKey) -> Result<()> {
        self.storage.delete(key)?;
        self.metadata.forget(key);
        if let Some(stats) = self.stats.as_mut() {
            stats.record_deletes(1);
        }
        Ok(())
    }

    fn live_keys(&mut self) -> Result<Vec<EntryKey>> {
        let mut live = Vec::new();
        for key in self.storage.list_all()? {
            if self.is_live(&key)? {
                live.push(key);
            }
        }
        live.sort();
        Ok(live)
    }

    fn live_filter(&mut self, live_only: bool) -> Result<Option<Vec<EntryKey>>> {
        if live_only {
            Ok(Some(self.live_keys()?))
        } else {
            Ok(None)
        }
    }
}

/// Sorted copy of a metadata table, optionally restricted to sorted `live` keys.
fn snapshot<T: Copy>(
    table: &HashMap<EntryKey, T>,
    live: Option<&[EntryKey]>,
) -> BTreeMap<EntryKey, T> {
    table
        .iter()
        .filter(|(key, _)| live.map_or(true, |live| live.binary_search(key).is_ok()))
        .map(|(key, value)| (key.clone(), *value))
        .collect()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Signature;
    use std::thread::sleep;

    fn engine(config: CacheConfig) -> CacheEngine<i64> {
        config.build().unwrap()
    }

    fn key(name: &str) -> EntryKey {
        EntryKey::from(name)
    }

    fn stats(engine: &CacheEngine<i64>) -> CacheStats {
        engine.stats().cloned().unwrap()
    }

    #[test]
    fn test_save_load_delete() {
        let mut cache = engine(CacheConfig::new());
        cache.save(&key("a"), &1).unwrap();

        assert!(cache.exists(&key("a")).unwrap());
        assert_eq!(cache.load(&key("a"), true).unwrap(), Lookup::Hit(1));

        cache.delete(&key("a")).unwrap();
        assert!(!cache.exists(&key("a")).unwrap());
        assert_eq!(cache.load(&key("a"), false).unwrap(), Lookup::Miss);
        assert!(matches!(
            cache.load(&key("a"), true),
            Err(CacheError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_does_not_count_as_check() {
        let mut cache = engine(CacheConfig::new());
        cache.save(&key("a"), &1).unwrap();
        cache.load(&key("a"), true).unwrap();
        assert!(!cache.exists(&key("b")).unwrap());

        let stats = stats(&cache);
        assert_eq!(stats.n_saves, 1);
        assert_eq!(stats.n_loads, 1);
        assert_eq!(stats.n_checks, 1);
        assert_eq!(stats.n_misses, 1);
        assert_eq!(stats.n_hits, 0);
    }

    #[test]
    fn test_ttl_expiry() {
        let mut cache = engine(CacheConfig::new().with_ttl(Duration::from_millis(50)));
        cache.save(&key("a"), &1).unwrap();
        assert!(cache.exists(&key("a")).unwrap());

        sleep(Duration::from_millis(80));
        assert!(!cache.exists(&key("a")).unwrap());
        assert_eq!(cache.size().unwrap(), 0);

        let stats = stats(&cache);
        assert_eq!(stats.n_ttl_evictions, 1);
        assert_eq!(stats.n_deletes, 1);
    }

    #[test]
    fn test_resave_after_expiry_resets_creation_time() {
        let mut cache = engine(CacheConfig::new().with_ttl(Duration::from_millis(50)));
        cache.save(&key("a"), &1).unwrap();
        sleep(Duration::from_millis(80));

        cache.save(&key("a"), &2).unwrap();
        assert_eq!(cache.load(&key("a"), true).unwrap(), Lookup::Hit(2));
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = engine(CacheConfig::new().with_max_size(3));
        for name in ["a", "b", "c"] {
            cache.save(&key(name), &0).unwrap();
        }
        cache.load(&key("a"), true).unwrap();
        cache.save(&key("d"), &0).unwrap();

        assert_eq!(cache.keys().unwrap(), vec![key("a"), key("c"), key("d")]);
        assert_eq!(stats(&cache).n_size_evictions, 1);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let mut cache = engine(
            CacheConfig::new()
                .with_max_size(2)
                .with_policy(EvictionPolicy::Fifo),
        );
        cache.save(&key("a"), &1).unwrap();
        cache.save(&key("b"), &2).unwrap();
        cache.save(&key("a"), &3).unwrap();

        assert_eq!(cache.size().unwrap(), 2);
        assert_eq!(stats(&cache).n_size_evictions, 0);
        assert_eq!(cache.load(&key("a"), true).unwrap(), Lookup::Hit(3));
    }

    #[test]
    fn test_evict_to_size() {
        let mut cache = engine(
            CacheConfig::new()
                .with_max_size(10)
                .with_policy(EvictionPolicy::Lfu),
        );
        for name in ["a", "b", "c", "d"] {
            cache.save(&key(name), &0).unwrap();
        }
        cache.load(&key("c"), true).unwrap();

        assert_eq!(cache.evict_to_size(1).unwrap(), 3);
        assert_eq!(cache.keys().unwrap(), vec![key("c")]);
        assert_eq!(cache.evict_to_size(5).unwrap(), 0);
    }

    #[test]
    fn test_evict_without_policy_fails() {
        let mut cache = engine(CacheConfig::new());
        assert!(matches!(
            cache.evict_to_size(0),
            Err(CacheError::Configuration(_))
        ));
    }

    #[test]
    fn test_custom_policy_must_pick_candidate() {
        let mut cache = engine(
            CacheConfig::new()
                .with_max_size(1)
                .with_custom_policy(|_| Some(EntryKey::from("nope"))),
        );
        cache.save(&key("a"), &1).unwrap();
        assert!(matches!(
            cache.save(&key("b"), &2),
            Err(CacheError::Configuration(_))
        ));
    }

    #[test]
    fn test_delete_all_counts_live_entries() {
        let mut cache = engine(CacheConfig::new());
        cache.delete_all().unwrap();
        assert_eq!(stats(&cache).n_deletes, 0);

        for name in ["a", "b", "c"] {
            cache.save(&key(name), &0).unwrap();
        }
        cache.delete_all().unwrap();
        assert_eq!(cache.size().unwrap(), 0);
        assert_eq!(stats(&cache).n_deletes, 3);
    }

    #[test]
    fn test_get_or_compute_counts() {
        let mut cache = engine(CacheConfig::new());
        let args = CallArgs::new().arg(4);
        let mut calls = 0;

        for _ in 0..2 {
            let value = cache
                .get_or_compute(&args, CallOptions::default(), |_| {
                    calls += 1;
                    16
                })
                .unwrap();
            assert_eq!(value, 16);
        }

        assert_eq!(calls, 1);
        let stats = stats(&cache);
        assert_eq!(stats.n_hashes, 2);
        assert_eq!(stats.n_checks, 2);
        assert_eq!(stats.n_hits, 1);
        assert_eq!(stats.n_misses, 1);
        assert_eq!(stats.n_saves, 1);
        assert_eq!(stats.n_loads, 1);
    }

    #[test]
    fn test_call_options() {
        let mut cache = engine(CacheConfig::new());
        let args = CallArgs::new().arg("x");

        cache.get_or_compute(&args, CallOptions::bypass(), |_| 1).unwrap();
        assert_eq!(stats(&cache).n_hashes, 0);
        assert_eq!(cache.size().unwrap(), 0);

        cache.get_or_compute(&args, CallOptions::refresh(), |_| 2).unwrap();
        cache.get_or_compute(&args, CallOptions::refresh(), |_| 3).unwrap();
        assert_eq!(cache.load_for(&args, true).unwrap(), Lookup::Hit(3));

        let no_save = CallOptions {
            load: true,
            save: false,
        };
        assert_eq!(cache.get_or_compute(&args, no_save, |_| 9).unwrap(), 3);
    }

    #[test]
    fn test_failed_computation_not_stored() {
        let mut cache = engine(CacheConfig::new());
        let args = CallArgs::new().arg(1);

        let result: std::result::Result<i64, CacheError> =
            cache.get_or_try_compute(&args, CallOptions::default(), |_| {
                Err(CacheError::Storage("backend down".to_string()))
            });
        assert!(result.is_err());
        assert!(!cache.exists_for(&args).unwrap());
    }

    #[test]
    fn test_metadata_accessors() {
        let mut cache = engine(CacheConfig::new().with_detailed_stats(true));
        cache.save(&key("a"), &1).unwrap();
        cache.load(&key("a"), true).unwrap();

        assert!(cache.creation_time(&key("a")).unwrap().is_some());
        assert_eq!(cache.access_count(&key("a")).unwrap(), Some(1));
        assert!(cache.entry_age(&key("a")).unwrap().is_some());
        assert_eq!(cache.access_counts(true).unwrap().len(), 1);
        assert_eq!(cache.access_time(&key("missing")).unwrap(), None);
    }

    #[test]
    fn test_untracked_metadata_errors() {
        let mut cache = engine(CacheConfig::new());
        assert!(matches!(
            cache.creation_time(&key("a")),
            Err(CacheError::Configuration(_))
        ));
        assert!(cache.access_times(false).is_err());
    }

    #[test]
    fn test_disabled_stats() {
        let mut cache = engine(CacheConfig::new().with_basic_stats(false));
        cache.save(&key("a"), &1).unwrap();
        assert!(cache.stats().is_none());
        assert!(cache.summary().unwrap().stats.is_none());
    }

    #[test]
    fn test_invalid_configurations() {
        let zero = CacheConfig::new().with_max_size(0).build::<i64>();
        assert!(matches!(zero, Err(CacheError::Configuration(_))));

        let policy_only = CacheConfig::new()
            .with_policy(EvictionPolicy::Lfu)
            .build::<i64>();
        assert!(matches!(policy_only, Err(CacheError::Configuration(_))));

        let zero_ttl = CacheConfig::new().with_ttl(Duration::ZERO).build::<i64>();
        assert!(zero_ttl.is_err());

        let normalize_without_signature = CacheConfig::new().with_normalize(true).build::<i64>();
        assert!(normalize_without_signature.is_err());
    }

    #[test]
    fn test_normalized_keys_through_engine() {
        let signature = Signature::new().param("a").param("b").param_with_default("c", 0);
        let mut cache = engine(CacheConfig::new().with_signature(signature));

        let positional = CallArgs::new().arg(1).arg(2).arg(3);
        let named = CallArgs::new().kwarg("c", 3).kwarg("a", 1).kwarg("b", 2);
        assert_eq!(
            cache.derive_key(&positional).unwrap(),
            cache.derive_key(&named).unwrap()
        );
    }

    #[test]
    fn test_default_name_is_unique() {
        let a = engine(CacheConfig::new());
        let b = engine(CacheConfig::new());
        assert_ne!(a.name(), b.name());
        assert!(a.name().starts_with("cache-"));
    }
}
