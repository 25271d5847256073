//! Cache Module
//!
//! Memoization cache engine with TTL expiration and size-bounded eviction.

mod engine;
mod entry;
mod metadata;
mod policy;
mod shared;
mod stats;


// Re-export public types
pub use engine::{CacheEngine, CallOptions};
pub use entry::{CacheValue, EntryKey, Lookup, MonotonicClock, Timestamp};
pub use metadata::EntryMetadata;
pub use policy::{CustomEvictionFn, EvictionCandidates, EvictionPolicy};
pub use shared::SharedCache;
pub use stats::CacheStats;
