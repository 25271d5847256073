//! Storage Module
//!
//! The contract the cache engine uses to persist entries, and the reference
//! adapters implementing it.

mod disk;
mod memory;
mod null;

use std::path::{Path, PathBuf};

use crate::cache::{CacheValue, EntryKey, Timestamp};
use crate::error::Result;

pub use disk::{Codec, DiskStore, FileFormat, ENTRY_SUFFIX};
pub use memory::MemoryStore;
pub use null::NullStore;

// == Storage Adapter ==
/// Raw persistence of cache values, addressed by entry key.
///
/// Adapters own values only. Statistics and eviction bookkeeping live in the
/// engine.
pub trait StorageAdapter<V>: Send {
    /// Whether a value is stored under `key`. Must not change any metadata.
    fn exists(&self, key: &EntryKey) -> Result<bool>;

    /// Stores `value`, overwriting any previous value.
    fn save(&mut self, key: &EntryKey, value: &V) -> Result<()>;

    /// Returns the value under `key`. Only called after `exists` returned true.
    fn load(&mut self, key: &EntryKey) -> Result<V>;

    /// Removes the value under `key`; no-op if absent.
    fn delete(&mut self, key: &EntryKey) -> Result<()>;

    /// Every stored key. Entries may be stale; callers re-check TTL.
    fn list_all(&self) -> Result<Vec<EntryKey>>;

    /// Removes every stored value.
    fn clear(&mut self) -> Result<()> {
        for key in self.list_all()? {
            self.delete(&key)?;
        }
        Ok(())
    }

    /// Creation time recorded by the medium itself, if it keeps one.
    fn created_at(&self, _key: &EntryKey) -> Result<Option<Timestamp>> {
        Ok(None)
    }

    /// Last access time recorded by the medium itself, if it keeps one.
    fn accessed_at(&self, _key: &EntryKey) -> Result<Option<Timestamp>> {
        Ok(None)
    }

    /// Whether keys should default to fixed-length digests.
    fn prefers_fixed_length_keys(&self) -> bool {
        false
    }
}

// == Backend Kind ==
/// Storage selection in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Values kept in a map inside the process
    #[default]
    Memory,
    /// One file per entry; a temporary directory when `dir` is None
    Disk {
        dir: Option<PathBuf>,
        format: FileFormat,
    },
    /// Nothing is ever stored
    Null,
}

// == Backend ==
/// The storage adapter owned by a cache engine.
pub enum Backend<V> {
    InMemory(MemoryStore<V>),
    OnDisk(DiskStore<V>),
    NoOp(NullStore),
    Custom(Box<dyn StorageAdapter<V>>),
}

impl<V: CacheValue> Backend<V> {
    /// Opens the adapter described by `kind`.
    pub fn open(kind: &BackendKind) -> Result<Self> {
        match kind {
            BackendKind::Memory => Ok(Backend::InMemory(MemoryStore::new())),
            BackendKind::Disk { dir, format } => {
                let store = match dir {
                    Some(dir) => DiskStore::open(dir, *format)?,
                    None => DiskStore::temporary(*format)?,
                };
                Ok(Backend::OnDisk(store))
            }
            BackendKind::Null => Ok(Backend::NoOp(NullStore::new())),
        }
    }

    /// Short label used in logs and summaries.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::InMemory(_) => "memory",
            Backend::OnDisk(_) => "disk",
            Backend::NoOp(_) => "null",
            Backend::Custom(_) => "custom",
        }
    }

    /// Directory holding the entry files, for the disk backend only.
    pub fn storage_dir(&self) -> Option<&Path> {
        match self {
            Backend::OnDisk(store) => Some(store.dir()),
            _ => None,
        }
    }

    fn adapter(&self) -> &dyn StorageAdapter<V> {
        match self {
            Backend::InMemory(store) => store,
            Backend::OnDisk(store) => store,
            Backend::NoOp(store) => store,
            Backend::Custom(store) => store.as_ref(),
        }
    }

    fn adapter_mut(&mut self) -> &mut dyn StorageAdapter<V> {
        match self {
            Backend::InMemory(store) => store,
            Backend::OnDisk(store) => store,
            Backend::NoOp(store) => store,
            Backend::Custom(store) => store.as_mut(),
        }
    }
}

impl<V: CacheValue> StorageAdapter<V> for Backend<V> {
    fn exists(&self, key: &EntryKey) -> Result<bool> {
        self.adapter().exists(key)
    }

    fn save(&mut self, key: &EntryKey, value: &V) -> Result<()> {
        self.adapter_mut().save(key, value)
    }

    fn load(&mut self, key: &EntryKey) -> Result<V> {
        self.adapter_mut().load(key)
    }

    fn delete(&mut self, key: &EntryKey) -> Result<()> {
        self.adapter_mut().delete(key)
    }

    fn list_all(&self) -> Result<Vec<EntryKey>> {
        self.adapter().list_all()
    }

    fn clear(&mut self) -> Result<()> {
        self.adapter_mut().clear()
    }

    fn created_at(&self, key: &EntryKey) -> Result<Option<Timestamp>> {
        self.adapter().created_at(key)
    }

    fn accessed_at(&self, key: &EntryKey) -> Result<Option<Timestamp>> {
        self.adapter().accessed_at(key)
    }

    fn prefers_fixed_length_keys(&self) -> bool {
        self.adapter().prefers_fixed_length_keys()
    }
}
