//! Report models
//!
//! Serializable views of cache state for logging and diagnostics.

pub mod summary;

pub use summary::CacheSummary;
