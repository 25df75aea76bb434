//! Disk-backed cache store for feed responses
//!
//! Provides a `CacheStore` that persists serializable responses to JSON files,
//! one file per cache key. Entries carry no expiry: every successful fetch
//! overwrites the previous entry for its key, and the most recent write wins.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading or writing the cache
///
/// Storage failures are never swallowed: a missing entry is `Ok(None)` on
/// read, but an unreadable directory or corrupt entry is an error the caller
/// has to handle.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem operation failed
    #[error("cache storage failed: {0}")]
    Io(#[from] io::Error),

    /// The stored entry (or the value being stored) is not valid JSON
    #[error("cache entry '{key}' is corrupt: {source}")]
    Corrupt {
        /// Cache key of the offending entry
        key: String,
        /// Underlying JSON error
        source: serde_json::Error,
    },
}

/// Wrapper struct for cached data stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry<T> {
    /// The cached response
    data: T,
    /// When the response was cached
    cached_at: DateTime<Utc>,
}

/// Result of reading an entry from the cache
#[derive(Debug)]
pub struct CachedEntry<T> {
    /// The cached response
    pub data: T,
    /// When the response was cached
    pub cached_at: DateTime<Utc>,
}

/// Manages reading and writing cached responses on disk
///
/// Responses are stored as JSON files in a platform cache directory
/// (`~/.cache/socialkit/` on Linux), or in an explicit directory supplied via
/// [`CacheStore::with_dir`]. An entry, if present, always reflects the most
/// recent fully written response for its key; writes replace the whole file.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl CacheStore {
    /// Creates a new CacheStore in the platform cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no
    /// home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "socialkit")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a new CacheStore with a custom cache directory
    ///
    /// Useful for testing or when the host application owns the location.
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Returns the path to the cache file for the given key
    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// Writes a response to the cache, replacing any previous entry
    ///
    /// # Arguments
    /// * `key` - Cache key (e.g., "followers_alice")
    /// * `data` - The response to cache
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(CacheError)` if directory creation, serialization, or the file
    ///   write fails
    pub fn write<T: Serialize>(&self, key: &str, data: &T) -> Result<(), CacheError> {
        self.ensure_dir()?;

        let entry = StoredEntry {
            data,
            cached_at: Utc::now(),
        };

        let json = serde_json::to_string_pretty(&entry).map_err(|source| CacheError::Corrupt {
            key: key.to_string(),
            source,
        })?;

        fs::write(self.entry_path(key), json)?;
        Ok(())
    }

    /// Reads a response from the cache
    ///
    /// # Returns
    /// * `Ok(Some(CachedEntry<T>))` if an entry exists for the key
    /// * `Ok(None)` if no entry has ever been written for the key
    /// * `Err(CacheError)` if the entry exists but cannot be read or parsed
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CachedEntry<T>>, CacheError> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let entry: StoredEntry<T> =
            serde_json::from_str(&content).map_err(|source| CacheError::Corrupt {
                key: key.to_string(),
                source,
            })?;

        Ok(Some(CachedEntry {
            data: entry.data,
            cached_at: entry.cached_at,
        }))
    }

    /// Removes every entry from the cache
    ///
    /// Used on sign-out, when cached feeds belong to the previous user.
    pub fn clear(&self) -> Result<(), CacheError> {
        match fs::read_dir(&self.cache_dir) {
            Ok(entries) => {
                for entry in entries {
                    let path = entry?.path();
                    if path.extension().is_some_and(|ext| ext == "json") {
                        fs::remove_file(path)?;
                    }
                }
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
