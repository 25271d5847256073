//! Cache summary report
//!
//! Serializable snapshot of a cache's configuration, size and counters.

use std::fmt;

use serde::Serialize;

use crate::cache::CacheStats;

/// Point-in-time report produced by `CacheEngine::summary`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheSummary {
    pub name: String,
    /// Storage backend label
    pub backend: String,
    /// Key derivation mode label
    pub key_mode: String,
    /// Live entries when the summary was taken
    pub entries: usize,
    pub ttl_secs: Option<f64>,
    pub max_size: Option<usize>,
    pub policy: Option<String>,
    /// Counters, absent when basic statistics are disabled
    pub stats: Option<CacheStats>,
    /// Hits / checks
    pub hit_rate: Option<f64>,
    pub tracked_creation_times: Option<usize>,
    pub tracked_access_times: Option<usize>,
    pub tracked_access_counts: Option<usize>,
    /// Generation time in ISO 8601 format
    pub generated_at: String,
}

impl CacheSummary {
    /// Renders the summary as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for CacheSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Cache '{}' ({} storage, {} keys)",
            self.name, self.backend, self.key_mode
        )?;
        writeln!(f, "  entries: {}", self.entries)?;
        match self.ttl_secs {
            Some(ttl) => writeln!(f, "  ttl: {}s", ttl)?,
            None => writeln!(f, "  ttl: none")?,
        }
        match (self.max_size, &self.policy) {
            (Some(max_size), Some(policy)) => writeln!(f, "  max_size: {} ({})", max_size, policy)?,
            _ => writeln!(f, "  max_size: unbounded")?,
        }
        if let Some(stats) = &self.stats {
            for (name, value) in stats.counters() {
                writeln!(f, "  {}: {}", name, value)?;
            }
        }
        if let Some(hit_rate) = self.hit_rate {
            writeln!(f, "  hit_rate: {:.3}", hit_rate)?;
        }
        for (table, rows) in [
            ("creation_times", self.tracked_creation_times),
            ("access_times", self.tracked_access_times),
            ("access_counts", self.tracked_access_counts),
        ] {
            if let Some(rows) = rows {
                writeln!(f, "  {}: {} tracked", table, rows)?;
            }
        }
        write!(f, "  generated_at: {}", self.generated_at)
    }
}
