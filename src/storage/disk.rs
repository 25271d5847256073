//! Disk Store Module
//!
//! Stores each cache entry as one file in a directory.
//!
//! File names are a reversible, filesystem-safe encoding of the entry key.
//! The file's modification time stands in for the entry's last access and
//! its creation time for the entry's creation.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::SystemTime;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::cache::{EntryKey, Timestamp};
use crate::error::{CacheError, Result};
use crate::storage::StorageAdapter;

/// Extension of every entry file.
pub const ENTRY_SUFFIX: &str = ".memo";

// == File Format ==
/// Built-in on-disk encodings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileFormat {
    /// Compact binary encoding (bincode)
    #[default]
    Bincode,
    /// Human-readable JSON
    Json,
}

impl FromStr for FileFormat {
    type Err = CacheError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bincode" | "binary" => Ok(FileFormat::Bincode),
            "json" => Ok(FileFormat::Json),
            other => Err(CacheError::Configuration(format!(
                "unsupported file format: {}",
                other
            ))),
        }
    }
}

pub type SaveFn<V> = Arc<dyn Fn(&Path, &V) -> Result<()> + Send + Sync>;
pub type LoadFn<V> = Arc<dyn Fn(&Path) -> Result<V> + Send + Sync>;

// == Codec ==
/// How values are written to and read from entry files.
pub enum Codec<V> {
    /// One of the built-in formats
    Format(FileFormat),
    /// Caller-supplied functions, given the entry file path
    Custom { save: SaveFn<V>, load: LoadFn<V> },
}

impl<V> Codec<V> {
    /// Wraps a save/load function pair.
    pub fn custom<S, L>(save: S, load: L) -> Self
    where
        S: Fn(&Path, &V) -> Result<()> + Send + Sync + 'static,
        L: Fn(&Path) -> Result<V> + Send + Sync + 'static,
    {
        Codec::Custom {
            save: Arc::new(save),
            load: Arc::new(load),
        }
    }
}

impl<V> fmt::Debug for Codec<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Format(format) => write!(f, "Format({:?})", format),
            Codec::Custom { .. } => f.write_str("Custom(<fn>)"),
        }
    }
}

// == Disk Store ==
/// Directory of entry files.
#[derive(Debug)]
pub struct DiskStore<V> {
    dir: PathBuf,
    codec: Codec<V>,
    _value: PhantomData<fn() -> V>,
}

impl<V> DiskStore<V> {
    // == Constructors ==
    /// Opens (creating if needed) a store in `dir`.
    pub fn open(dir: impl AsRef<Path>, format: FileFormat) -> Result<Self> {
        Self::with_codec(dir, Codec::Format(format))
    }

    /// Opens a store in a fresh temporary directory that outlives the store.
    pub fn temporary(format: FileFormat) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("memo_cache").tempdir()?.keep();
        Self::open(dir, format)
    }

    /// Opens a store with an explicit codec.
    pub fn with_codec(dir: impl AsRef<Path>, codec: Codec<V>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            codec,
            _value: PhantomData,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`.
    pub fn entry_path(&self, key: &EntryKey) -> PathBuf {
        self.dir
            .join(format!("{}{}", encode_file_stem(key.as_str()), ENTRY_SUFFIX))
    }

    fn file_time(&self, key: &EntryKey, created: bool) -> Result<Option<Timestamp>> {
        let meta = match fs::metadata(self.entry_path(key)) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let time = if created {
            // not every filesystem records birth time
            meta.created().or_else(|_| meta.modified())?
        } else {
            meta.modified()?
        };
        Ok(Some(Timestamp::from_system_time(time)))
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| CacheError::Io(e.error))?;
        Ok(())
    }
}

impl<V> StorageAdapter<V> for DiskStore<V>
where
    V: Serialize + DeserializeOwned + Send + 'static,
{
    fn exists(&self, key: &EntryKey) -> Result<bool> {
        match fs::metadata(self.entry_path(key)) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, key: &EntryKey, value: &V) -> Result<()> {
        let path = self.entry_path(key);
        match &self.codec {
            Codec::Format(FileFormat::Bincode) => {
                let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard())?;
                self.write_atomic(&path, &bytes)?;
            }
            Codec::Format(FileFormat::Json) => {
                let bytes = serde_json::to_vec(value)?;
                self.write_atomic(&path, &bytes)?;
            }
            Codec::Custom { save, .. } => save(&path, value)?,
        }
        debug!("Saved entry file {}", path.display());
        Ok(())
    }

    fn load(&mut self, key: &EntryKey) -> Result<V> {
        let path = self.entry_path(key);
        let value = match &self.codec {
            Codec::Format(FileFormat::Bincode) => {
                let bytes = fs::read(&path)?;
                let (value, _) =
                    bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
                value
            }
            Codec::Format(FileFormat::Json) => serde_json::from_slice(&fs::read(&path)?)?,
            Codec::Custom { load, .. } => load(&path)?,
        };
        if let Err(e) = touch(&path) {
            debug!("Could not update access time of {}: {}", path.display(), e);
        }
        Ok(value)
    }

    fn delete(&mut self, key: &EntryKey) -> Result<()> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list_all(&self) -> Result<Vec<EntryKey>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(ENTRY_SUFFIX) else {
                continue;
            };
            if let Some(key) = decode_file_stem(stem) {
                keys.push(EntryKey::new(key));
            }
        }
        Ok(keys)
    }

    fn created_at(&self, key: &EntryKey) -> Result<Option<Timestamp>> {
        self.file_time(key, true)
    }

    fn accessed_at(&self, key: &EntryKey) -> Result<Option<Timestamp>> {
        self.file_time(key, false)
    }

    fn prefers_fixed_length_keys(&self) -> bool {
        true
    }
}

fn touch(path: &Path) -> io::Result<()> {
    OpenOptions::new()
        .write(true)
        .open(path)?
        .set_modified(SystemTime::now())
}

// == Key Encoding ==
/// Bytes escaped in file names: everything but ASCII letters, digits, `-` and `_`.
const FILE_STEM: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

fn encode_file_stem(key: &str) -> String {
    utf8_percent_encode(key, FILE_STEM).to_string()
}

/// Inverse of `encode_file_stem`; None for names it could not have produced.
fn decode_file_stem(stem: &str) -> Option<String> {
    if !stem
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'%')
    {
        return None;
    }
    let key = percent_decode_str(stem).decode_utf8().ok()?.into_owned();
    (encode_file_stem(&key) == stem).then_some(key)
}
