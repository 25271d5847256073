//! Memory Store Module
//!
//! Keeps cache values in a HashMap inside the process.

use std::collections::HashMap;

use crate::cache::EntryKey;
use crate::error::{CacheError, Result};
use crate::storage::StorageAdapter;

// == Memory Store ==
/// In-process map from entry key to value.
#[derive(Debug)]
pub struct MemoryStore<V> {
    entries: HashMap<EntryKey, V>,
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send> StorageAdapter<V> for MemoryStore<V> {
    fn exists(&self, key: &EntryKey) -> Result<bool> {
        Ok(self.entries.contains_key(key))
    }

    fn save(&mut self, key: &EntryKey, value: &V) -> Result<()> {
        self.entries.insert(key.clone(), value.clone());
        Ok(())
    }

    fn load(&mut self, key: &EntryKey) -> Result<V> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| CacheError::Storage(format!("no stored value for key {}", key)))
    }

    fn delete(&mut self, key: &EntryKey) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<EntryKey>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}
