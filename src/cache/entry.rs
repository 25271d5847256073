//! Cache Entry Module
//!
//! Defines entry keys, timestamps and the result of a cache lookup.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// == Cache Value ==
/// Bound on values a cache can hold: cloneable for the in-memory store,
/// serializable for the on-disk store, sendable across threads.
pub trait CacheValue: Clone + Serialize + DeserializeOwned + Send + 'static {}

impl<T> CacheValue for T where T: Clone + Serialize + DeserializeOwned + Send + 'static {}

// == Entry Key ==
/// Deterministic identifier of a cache entry, derived from call arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryKey(String);

impl EntryKey {
    /// Wraps an already-derived key string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key and returns the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for EntryKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

// == Timestamp ==
/// Point in time as nanoseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The Unix epoch. Sorts before every real timestamp.
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Creates a timestamp from raw nanoseconds since the epoch.
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Returns the wall-clock time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Converts a `SystemTime`, clamping times before the epoch to it.
    pub fn from_system_time(time: SystemTime) -> Self {
        let nanos = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos().min(u64::MAX as u128) as u64)
            .unwrap_or(0);
        Self(nanos)
    }

    /// Returns nanoseconds since the epoch.
    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Time elapsed between this timestamp and `now`, zero if in the future.
    pub fn age_at(&self, now: Timestamp) -> Duration {
        Duration::from_nanos(now.0.saturating_sub(self.0))
    }

    /// Time elapsed since this timestamp.
    pub fn elapsed(&self) -> Duration {
        self.age_at(Timestamp::now())
    }

    /// Formats the timestamp as RFC 3339 in UTC.
    pub fn to_rfc3339(&self) -> String {
        let nanos = i64::try_from(self.0).unwrap_or(i64::MAX);
        Utc.timestamp_nanos(nanos).to_rfc3339()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

// == Monotonic Clock ==
/// Hands out strictly increasing timestamps that track the wall clock.
///
/// Two operations in the same clock tick still get distinct, ordered stamps,
/// which keeps recency and insertion order exact.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: u64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next timestamp, never equal to or before the previous one.
    pub fn stamp(&mut self) -> Timestamp {
        let now = Timestamp::now().as_nanos();
        let next = now.max(self.last.saturating_add(1));
        self.last = next;
        Timestamp(next)
    }

    /// Moves the clock forward so later stamps sort after `seen`.
    pub fn observe(&mut self, seen: Timestamp) {
        self.last = self.last.max(seen.0);
    }
}

// == Lookup ==
/// Outcome of a cache load that did not fail.
///
/// Keeps "no entry" distinct from a stored value of any shape, including
/// `None` or unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    /// Entry was present and live
    Hit(V),
    /// No live entry for the key
    Miss,
}

impl<V> Lookup<V> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Lookup::Miss)
    }

    /// Converts into an `Option`, mapping `Miss` to `None`.
    pub fn into_option(self) -> Option<V> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss => None,
        }
    }
}
