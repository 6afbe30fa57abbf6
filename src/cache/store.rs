//! Persistent key-value store for cached price data
//!
//! Provides a `CacheStore` that persists serializable entries to JSON files,
//! one file per key, stamped with the time the data was fetched. Staleness is
//! a read-time policy owned by the caller, so the envelope records only
//! `fetched_at`. Writes replace the whole entry atomically via a temp file
//! and rename, so a torn write can never leave a partial record behind.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::warn;

/// Monotonic suffix for temp file names, so concurrent writers to the same
/// key never share a scratch file.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Envelope persisted on disk around one cache value
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry<T> {
    /// The cached data
    data: T,
    /// When the data was fetched from upstream
    fetched_at: DateTime<Utc>,
}

/// Result of reading one entry from the store
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    /// The cached data
    pub data: T,
    /// When the data was fetched from upstream
    pub fetched_at: DateTime<Utc>,
}

/// Errors that can occur when reading or writing the store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading an entry file failed
    #[error("cache read failed for '{key}': {source}")]
    Read {
        key: String,
        source: std::io::Error,
    },

    /// An entry file exists but does not parse
    #[error("cache entry '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },

    /// Serializing a value for persistence failed
    #[error("cache entry '{key}' could not be serialized: {source}")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },

    /// Writing an entry file failed
    #[error("cache write failed for '{key}': {source}")]
    Write {
        key: String,
        source: std::io::Error,
    },

    /// Listing the cache directory failed
    #[error("cache scan failed: {source}")]
    Scan { source: std::io::Error },
}

/// File-per-key JSON store in an XDG-compliant cache directory
///
/// Exposes the three operations the price cache needs from durable storage:
/// point lookup by key, atomic upsert by key, and a scan of entries newer
/// than a cutoff restricted to a key prefix.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory where entry files are stored
    root: PathBuf,
}

impl CacheStore {
    /// Creates a store rooted at the XDG cache directory
    ///
    /// Uses `~/.cache/farehop/` on Linux, or the platform equivalent.
    /// Returns `None` if no base directory can be determined.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "farehop")?;
        let root = project_dirs.cache_dir().to_path_buf();
        Some(Self { root })
    }

    /// Creates a store rooted at a custom directory
    ///
    /// Used by tests and by the `--cache-dir` override.
    pub fn with_dir(root: PathBuf) -> Self {
        Self { root }
    }

    /// Returns the path of the entry file for a key
    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    /// Point lookup by key
    ///
    /// # Returns
    /// * `Ok(Some(Stored<T>))` if the entry exists and parses
    /// * `Ok(None)` if no entry exists for the key
    /// * `Err(StoreError)` if the file cannot be read or parsed
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Stored<T>>, StoreError> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StoreError::Read {
                    key: key.to_string(),
                    source: err,
                })
            }
        };

        let entry: StoredEntry<T> =
            serde_json::from_str(&content).map_err(|err| StoreError::Corrupt {
                key: key.to_string(),
                source: err,
            })?;

        Ok(Some(Stored {
            data: entry.data,
            fetched_at: entry.fetched_at,
        }))
    }

    /// Replaces the entry for a key atomically
    ///
    /// Serializes the value into a uniquely named temp file in the cache
    /// directory, then renames it over the final path: last full write wins,
    /// and readers never observe a partial record.
    ///
    /// # Arguments
    /// * `key` - Unique identifier for the entry (e.g. "edge_YVR-KEF_2026-03-14")
    /// * `data` - The value to persist
    /// * `fetched_at` - When the value was fetched from upstream
    pub fn upsert<T: Serialize>(
        &self,
        key: &str,
        data: &T,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.ensure_dir().map_err(|err| StoreError::Write {
            key: key.to_string(),
            source: err,
        })?;

        let entry = StoredEntry { data, fetched_at };
        let json = serde_json::to_string_pretty(&entry).map_err(|err| StoreError::Serialize {
            key: key.to_string(),
            source: err,
        })?;

        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp_path = self.root.join(format!("{}.{}.tmp", key, seq));
        let final_path = self.entry_path(key);

        fs::write(&tmp_path, json).map_err(|err| StoreError::Write {
            key: key.to_string(),
            source: err,
        })?;

        if let Err(err) = fs::rename(&tmp_path, &final_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StoreError::Write {
                key: key.to_string(),
                source: err,
            });
        }

        Ok(())
    }

    /// Lists entries with a key prefix fetched after the cutoff
    ///
    /// Entries that cannot be read or parsed are skipped with a logged
    /// warning rather than failing the scan. A missing cache directory
    /// yields an empty list.
    pub fn scan_newer_than<T: DeserializeOwned>(
        &self,
        prefix: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Stored<T>>, StoreError> {
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::Scan { source: err }),
        };

        let mut results = Vec::new();
        for dir_entry in dir {
            let dir_entry = match dir_entry {
                Ok(dir_entry) => dir_entry,
                Err(err) => return Err(StoreError::Scan { source: err }),
            };

            let file_name = dir_entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(key) = name.strip_suffix(".json") else {
                continue;
            };
            if !key.starts_with(prefix) {
                continue;
            }

            match self.get::<T>(key) {
                Ok(Some(stored)) if stored.fetched_at > cutoff => results.push(stored),
                Ok(_) => {}
                Err(err) => {
                    warn!(key, error = %err, "skipping unreadable cache entry during scan");
                }
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    fn create_test_store() -> (CacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = CacheStore::with_dir(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    fn sample(value: i32) -> TestData {
        TestData {
            name: "sample".to_string(),
            value,
        }
    }

    #[test]
    fn test_upsert_creates_entry_file() {
        let (store, temp_dir) = create_test_store();

        store
            .upsert("edge_YVR-SEA_2026-03-14", &sample(42), Utc::now())
            .expect("Upsert should succeed");

        let expected = temp_dir.path().join("edge_YVR-SEA_2026-03-14.json");
        assert!(expected.exists(), "Entry file should exist");

        let content = fs::read_to_string(&expected).expect("Should read file");
        assert!(content.contains("\"fetched_at\""));
        assert!(content.contains("42"));
    }

    #[test]
    fn test_upsert_leaves_no_temp_files_behind() {
        let (store, temp_dir) = create_test_store();

        store
            .upsert("edge_key", &sample(1), Utc::now())
            .expect("Upsert should succeed");

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .expect("Should read dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "No temp files should remain");
    }

    #[test]
    fn test_get_returns_none_for_missing_key() {
        let (store, _temp_dir) = create_test_store();

        let result: Option<Stored<TestData>> =
            store.get("nonexistent").expect("Missing key is not an error");

        assert!(result.is_none());
    }

    #[test]
    fn test_get_returns_data_and_fetched_at() {
        let (store, _temp_dir) = create_test_store();
        let fetched_at = Utc::now() - Duration::hours(2);

        store
            .upsert("some_key", &sample(7), fetched_at)
            .expect("Upsert should succeed");

        let stored: Stored<TestData> = store
            .get("some_key")
            .expect("Read should succeed")
            .expect("Entry should exist");

        assert_eq!(stored.data, sample(7));
        assert_eq!(stored.fetched_at, fetched_at);
    }

    #[test]
    fn test_get_reports_corrupt_entry() {
        let (store, temp_dir) = create_test_store();
        fs::write(temp_dir.path().join("broken.json"), "{ not json").expect("Should write");

        let result: Result<Option<Stored<TestData>>, StoreError> = store.get("broken");

        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_upsert_replaces_existing_entry() {
        let (store, _temp_dir) = create_test_store();

        store
            .upsert("overwrite_key", &sample(1), Utc::now())
            .expect("First upsert should succeed");
        store
            .upsert("overwrite_key", &sample(2), Utc::now())
            .expect("Second upsert should succeed");

        let stored: Stored<TestData> = store
            .get("overwrite_key")
            .expect("Read should succeed")
            .expect("Entry should exist");
        assert_eq!(stored.data.value, 2, "Store should contain latest data");
    }

    #[test]
    fn test_upsert_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("nested").join("cache");
        let store = CacheStore::with_dir(nested.clone());

        store
            .upsert("nested_key", &sample(5), Utc::now())
            .expect("Upsert should succeed");

        assert!(nested.join("nested_key.json").exists());
    }

    #[test]
    fn test_scan_filters_by_prefix_and_cutoff() {
        let (store, _temp_dir) = create_test_store();
        let now = Utc::now();

        store
            .upsert("edge_fresh", &sample(1), now - Duration::hours(1))
            .expect("Upsert should succeed");
        store
            .upsert("edge_old", &sample(2), now - Duration::hours(30))
            .expect("Upsert should succeed");
        store
            .upsert("fare_fresh", &sample(3), now - Duration::hours(1))
            .expect("Upsert should succeed");

        let cutoff = now - Duration::hours(24);
        let results: Vec<Stored<TestData>> = store
            .scan_newer_than("edge_", cutoff)
            .expect("Scan should succeed");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].data.value, 1);
    }

    #[test]
    fn test_scan_skips_corrupt_entries() {
        let (store, temp_dir) = create_test_store();
        let now = Utc::now();

        store
            .upsert("edge_good", &sample(1), now)
            .expect("Upsert should succeed");
        fs::write(temp_dir.path().join("edge_bad.json"), "garbage").expect("Should write");

        let results: Vec<Stored<TestData>> = store
            .scan_newer_than("edge_", now - Duration::hours(1))
            .expect("Scan should succeed despite the corrupt entry");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].data.value, 1);
    }

    #[test]
    fn test_scan_on_missing_directory_returns_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = CacheStore::with_dir(temp_dir.path().join("never_created"));

        let results: Vec<Stored<TestData>> = store
            .scan_newer_than("edge_", Utc::now())
            .expect("Scan of missing directory should succeed");

        assert!(results.is_empty());
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(store) = CacheStore::new() {
            let path_str = store.root.to_string_lossy();
            assert!(
                path_str.contains("farehop"),
                "Cache path should contain project name"
            );
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }
}
