//! Memo Cache - A memoization cache engine
//!
//! Stores computation results under keys derived from call arguments, with
//! TTL expiration, LRU/FIFO/LFU eviction and usage statistics.

pub mod cache;
pub mod config;
pub mod error;
pub mod key;
pub mod models;
pub mod storage;

pub use cache::{CacheEngine, CacheStats, CallOptions, EntryKey, EvictionPolicy, Lookup, SharedCache};
pub use config::{CacheConfig, TrackingConfig};
pub use error::{CacheError, Result};
pub use key::{CallArgs, HashMode, Signature};
pub use storage::{BackendKind, FileFormat, StorageAdapter};
