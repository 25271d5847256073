//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Conflicting or incompatible options detected at construction
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Entry required by the caller is not in the cache
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// Call arguments could not be turned into an entry key
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Storage adapter reported a failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Filesystem failure inside a storage adapter
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary codec could not encode an entry
    #[error("Encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Binary codec could not decode an entry
    #[error("Decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// JSON codec failure
    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CacheError {
    /// Returns true for failures raised by the storage layer.
    ///
    /// These are propagated unchanged by the engine and never retried.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            CacheError::Storage(_)
                | CacheError::Io(_)
                | CacheError::Encode(_)
                | CacheError::Decode(_)
                | CacheError::Json(_)
        )
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
