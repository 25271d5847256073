//! Shared Cache Module
//!
//! Thread-safe handle around a cache engine.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::{CacheEngine, CacheStats, CacheValue, CallOptions, EntryKey, Lookup, Timestamp};
use crate::error::{CacheError, Result};
use crate::key::CallArgs;
use crate::models::CacheSummary;

// == Shared Cache ==
/// Cloneable handle to one engine behind a single instance lock.
///
/// Every operation holds the lock for its whole duration, storage I/O
/// included. `get_or_compute` releases it while the computation runs.
pub struct SharedCache<V: CacheValue> {
    inner: Arc<Mutex<CacheEngine<V>>>,
}

impl<V: CacheValue> Clone for SharedCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: CacheValue> SharedCache<V> {
    pub fn new(engine: CacheEngine<V>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Runs `f` with exclusive access to the engine.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut CacheEngine<V>) -> R) -> R {
        let mut engine = self.inner.lock();
        f(&mut engine)
    }

    pub fn name(&self) -> String {
        self.inner.lock().name().to_string()
    }

    pub fn derive_key(&self, args: &CallArgs) -> Result<EntryKey> {
        self.inner.lock().derive_key(args)
    }

    pub fn exists(&self, key: &EntryKey) -> Result<bool> {
        self.inner.lock().exists(key)
    }

    pub fn exists_for(&self, args: &CallArgs) -> Result<bool> {
        self.inner.lock().exists_for(args)
    }

    pub fn load(&self, key: &EntryKey, must_exist: bool) -> Result<Lookup<V>> {
        self.inner.lock().load(key, must_exist)
    }

    pub fn load_for(&self, args: &CallArgs, must_exist: bool) -> Result<Lookup<V>> {
        self.inner.lock().load_for(args, must_exist)
    }

    pub fn save(&self, key: &EntryKey, value: &V) -> Result<()> {
        self.inner.lock().save(key, value)
    }

    pub fn save_for(&self, args: &CallArgs, value: &V) -> Result<EntryKey> {
        self.inner.lock().save_for(args, value)
    }

    pub fn delete(&self, key: &EntryKey) -> Result<()> {
        self.inner.lock().delete(key)
    }

    pub fn delete_for(&self, args: &CallArgs) -> Result<()> {
        self.inner.lock().delete_for(args)
    }

    pub fn delete_all(&self) -> Result<()> {
        self.inner.lock().delete_all()
    }

    pub fn size(&self) -> Result<usize> {
        self.inner.lock().size()
    }

    pub fn keys(&self) -> Result<Vec<EntryKey>> {
        self.inner.lock().keys()
    }

    pub fn evict_to_size(&self, target: usize) -> Result<usize> {
        self.inner.lock().evict_to_size(target)
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> Option<CacheStats> {
        self.inner.lock().stats().cloned()
    }

    pub fn creation_times(&self, live_only: bool) -> Result<BTreeMap<EntryKey, Timestamp>> {
        self.inner.lock().creation_times(live_only)
    }

    pub fn access_times(&self, live_only: bool) -> Result<BTreeMap<EntryKey, Timestamp>> {
        self.inner.lock().access_times(live_only)
    }

    pub fn access_counts(&self, live_only: bool) -> Result<BTreeMap<EntryKey, u64>> {
        self.inner.lock().access_counts(live_only)
    }

    pub fn summary(&self) -> Result<CacheSummary> {
        self.inner.lock().summary()
    }

    // == Get Or Compute ==
    /// Returns the cached result for `args`, or computes and stores it.
    ///
    /// The lock is not held while `compute` runs, so it may use this cache.
    /// Two threads missing on the same key may both compute; the later save wins.
    pub fn get_or_compute<F>(&self, args: &CallArgs, options: CallOptions, compute: F) -> Result<V>
    where
        F: FnOnce(&CallArgs) -> V,
    {
        self.get_or_try_compute(args, options, |args| Ok::<V, CacheError>(compute(args)))
    }

    pub fn get_or_try_compute<F, E>(
        &self,
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
            if let Some(value) = self.inner.lock().lookup(key)? {
                return Ok(value);
            }
        }

        let value = compute(args)?;
        if let (Some(key), true) = (&key, options.save) {
            self.save(key, &value)?;
        }
        Ok(value)
    }
}
