//! Cache Statistics Module
//!
//! Tracks usage counters for hashing, lookups, writes and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Usage counters of a single cache instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of entry keys derived from call arguments
    pub n_hashes: u64,
    /// Number of existence checks
    pub n_checks: u64,
    /// Number of existence checks that found a live entry
    pub n_hits: u64,
    /// Number of existence checks that found nothing
    pub n_misses: u64,
    /// Number of values loaded from storage
    pub n_loads: u64,
    /// Number of values saved to storage
    pub n_saves: u64,
    /// Number of entries deleted, evictions included
    pub n_deletes: u64,
    /// Number of entries evicted to respect max_size
    pub n_size_evictions: u64,
    /// Number of entries expired by ttl
    pub n_ttl_evictions: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / checks, or 0.0 if no checks have been made.
    pub fn hit_rate(&self) -> f64 {
        if self.n_checks == 0 {
            0.0
        } else {
            self.n_hits as f64 / self.n_checks as f64
        }
    }

    // == Record Hash ==
    /// Counts one derived key.
    pub fn record_hash(&mut self) {
        self.n_hashes += 1;
    }

    // == Record Check ==
    /// Counts one existence check and its outcome.
    pub fn record_check(&mut self, hit: bool) {
        self.n_checks += 1;
        if hit {
            self.n_hits += 1;
        } else {
            self.n_misses += 1;
        }
    }

    // == Record Load ==
    /// Counts a load that returned a value.
    pub fn record_load(&mut self) {
        self.n_loads += 1;
    }

    // == Record Save ==
    /// Counts one stored value, overwrites included.
    pub fn record_save(&mut self) {
        self.n_saves += 1;
    }

    // == Record Deletes ==
    /// Adds `count` deletions in one step.
    pub fn record_deletes(&mut self, count: u64) {
        self.n_deletes += count;
    }

    // == Record Evictions ==
    /// Counts an entry removed to make room.
    pub fn record_size_eviction(&mut self) {
        self.n_size_evictions += 1;
    }

    /// Counts an entry removed because it outlived the TTL.
    pub fn record_ttl_eviction(&mut self) {
        self.n_ttl_evictions += 1;
    }

    // == Counters ==
    /// Returns every counter paired with its name, in a stable order.
    pub fn counters(&self) -> [(&'static str, u64); 9] {
        [
            ("n_hashes", self.n_hashes),
            ("n_checks", self.n_checks),
            ("n_hits", self.n_hits),
            ("n_misses", self.n_misses),
            ("n_loads", self.n_loads),
            ("n_saves", self.n_saves),
            ("n_deletes", self.n_deletes),
            ("n_size_evictions", self.n_size_evictions),
            ("n_ttl_evictions", self.n_ttl_evictions),
        ]
    }

    /// Looks up a counter by name.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.counters()
            .into_iter()
            .find(|(counter, _)| *counter == name)
            .map(|(_, value)| value)
    }
}
