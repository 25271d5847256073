//! Null Store Module
//!
//! An adapter that never stores anything, for switching caching off without
//! touching call sites.

use crate::cache::EntryKey;
use crate::error::{CacheError, Result};
use crate::storage::StorageAdapter;

/// Storage that always reports absence.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl NullStore {
    pub fn new() -> Self {
        NullStore
    }
}

impl<V> StorageAdapter<V> for NullStore {
    fn exists(&self, _key: &EntryKey) -> Result<bool> {
        Ok(false)
    }

    fn save(&mut self, _key: &EntryKey, _value: &V) -> Result<()> {
        Ok(())
    }

    fn load(&mut self, key: &EntryKey) -> Result<V> {
        Err(CacheError::NotFound(key.to_string()))
    }

    fn delete(&mut self, _key: &EntryKey) -> Result<()> {
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<EntryKey>> {
        Ok(Vec::new())
    }

    fn clear(&mut self) -> Result<()> {
        Ok(())
    }
}
