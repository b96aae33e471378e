//! Storage collaborators behind the `Database` effect.
//!
//! The shell does not own a schema: a store maps counter names to values.
//! Two backends:
//!   - `FileStore`:   JSON document + SHA-256 checksum, fsync'd atomic replace
//!   - `MemoryStore`: process-local map with failure injection

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::StorageError;

/// Record persistence used by the Database handler.
///
/// Called from the loop thread in inline mode and from a worker thread in
/// background mode, hence `Send + Sync`.
pub trait CounterStore: Send + Sync {
    /// Current value of `name`; a counter never written reads as 0.
    fn fetch(&self, name: &str) -> Result<i64, StorageError>;

    fn update(&self, name: &str, value: i64) -> Result<(), StorageError>;
}

/// Build the store selected by `config`.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn CounterStore>, StorageError> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::File => {
            let path = match &config.path {
                Some(path) => path.clone(),
                None => FileStore::default_path()?,
            };
            Ok(Arc::new(FileStore::open(&path)?))
        }
    }
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

const FORMAT_VERSION: u32 = 1;

/// On-disk document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreDocument {
    format_version: u32,
    counters: BTreeMap<String, i64>,
    /// SHA-256 of the compact JSON of `counters` (lowercase hex).
    checksum: String,
}

/// Counters persisted in a single JSON file.
///
/// Writes go to a sibling temp file, are fsync'd, then renamed over the
/// original, so a crash leaves either the old or the new document.
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// `<data_local_dir>/persistent-counter/counter.json`.
    pub fn default_path() -> Result<PathBuf, StorageError> {
        let mut path = dirs::data_local_dir().ok_or(StorageError::NoDataDir)?;
        path.push("persistent-counter");
        path.push("counter.json");
        Ok(path)
    }

    /// Open a store at `path`, creating parent directories if needed.
    /// The file itself is created on first write.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_counters(&self) -> Result<BTreeMap<String, i64>, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(io_error(&self.path, e)),
        };

        let doc: StoreDocument = serde_json::from_str(&content).map_err(|e| {
            StorageError::Corrupted {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;
        if doc.format_version != FORMAT_VERSION {
            return Err(StorageError::Corrupted {
                path: self.path.clone(),
                reason: format!("unsupported format_version {}", doc.format_version),
            });
        }
        let expected = counters_checksum(&doc.counters)?;
        if expected != doc.checksum {
            return Err(StorageError::Corrupted {
                path: self.path.clone(),
                reason: "checksum mismatch".to_string(),
            });
        }
        Ok(doc.counters)
    }

    fn write_counters(&self, counters: BTreeMap<String, i64>) -> Result<(), StorageError> {
        let checksum = counters_checksum(&counters)?;
        let doc = StoreDocument {
            format_version: FORMAT_VERSION,
            counters,
            checksum,
        };
        let content = serde_json::to_string(&doc)?;

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp).map_err(|e| io_error(&tmp, e))?;
            file.write_all(content.as_bytes())
                .map_err(|e| io_error(&tmp, e))?;
            file.sync_all().map_err(|e| io_error(&tmp, e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| io_error(&self.path, e))?;
        Ok(())
    }
}

impl CounterStore for FileStore {
    fn fetch(&self, name: &str) -> Result<i64, StorageError> {
        let counters = self.read_counters()?;
        Ok(counters.get(name).copied().unwrap_or(0))
    }

    fn update(&self, name: &str, value: i64) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut counters = self.read_counters()?;
        counters.insert(name.to_string(), value);
        self.write_counters(counters)?;
        debug!(path = %self.path.display(), name, value, "counter persisted");
        Ok(())
    }
}

fn counters_checksum(counters: &BTreeMap<String, i64>) -> Result<String, StorageError> {
    let json = serde_json::to_string(counters)?;
    let digest = Sha256::digest(json.as_bytes());
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

fn io_error(path: &Path, source: io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Memory store
// ---------------------------------------------------------------------------

/// Process-local store. `fail_with` makes every operation fail until
/// `recover` is called.
#[derive(Debug, Default)]
pub struct MemoryStore {
    counters: Mutex<BTreeMap<String, i64>>,
    failure: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counter(name: &str, value: i64) -> Self {
        let store = Self::new();
        if let Ok(mut counters) = store.counters.lock() {
            counters.insert(name.to_string(), value);
        }
        store
    }

    pub fn fail_with(&self, message: &str) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(message.to_string());
        }
    }

    pub fn recover(&self) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = None;
        }
    }

    /// Stored value without defaulting, for inspection.
    pub fn get(&self, name: &str) -> Option<i64> {
        self.counters
            .lock()
            .ok()
            .and_then(|counters| counters.get(name).copied())
    }

    fn check_failure(&self) -> Result<(), StorageError> {
        let failure = self.failure.lock().map_err(|_| StorageError::Poisoned)?;
        match failure.as_ref() {
            Some(message) => Err(StorageError::Rejected(message.clone())),
            None => Ok(()),
        }
    }
}

impl CounterStore for MemoryStore {
    fn fetch(&self, name: &str) -> Result<i64, StorageError> {
        self.check_failure()?;
        let counters = self.counters.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(counters.get(name).copied().unwrap_or(0))
    }

    fn update(&self, name: &str, value: i64) -> Result<(), StorageError> {
        self.check_failure()?;
        let mut counters = self.counters.lock().map_err(|_| StorageError::Poisoned)?;
        counters.insert(name.to_string(), value);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (FileStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(&dir.path().join("nested").join("counter.json")).unwrap();
        (store, dir)
    }

    // ── FileStore ───────────────────────────────────────────────────

    #[test]
    fn missing_file_reads_zero() {
        let (store, _dir) = temp_store();
        assert_eq!(store.fetch("app").unwrap(), 0);
        assert!(!store.path().exists(), "reads must not create the file");
    }

    #[test]
    fn update_then_fetch() {
        let (store, _dir) = temp_store();
        store.update("app", 42).unwrap();
        assert_eq!(store.fetch("app").unwrap(), 42);
        assert_eq!(store.fetch("other").unwrap(), 0);
    }

    #[test]
    fn survives_reopen() {
        let (store, _dir) = temp_store();
        store.update("app", -5).unwrap();
        store.update("guests", 3).unwrap();

        let reopened = FileStore::open(store.path()).unwrap();
        assert_eq!(reopened.fetch("app").unwrap(), -5);
        assert_eq!(reopened.fetch("guests").unwrap(), 3);
    }

    #[test]
    fn no_temp_file_left_behind() {
        let (store, _dir) = temp_store();
        store.update("app", 1).unwrap();
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn tampered_value_is_corrupted() {
        let (store, _dir) = temp_store();
        store.update("app", 7).unwrap();
        let content = fs::read_to_string(store.path()).unwrap();
        fs::write(store.path(), content.replace("\"app\":7", "\"app\":8")).unwrap();

        match store.fetch("app") {
            Err(StorageError::Corrupted { reason, .. }) => {
                assert_eq!(reason, "checksum mismatch");
            }
            other => panic!("Expected Corrupted, got: {:?}", other),
        }
    }

    #[test]
    fn garbage_file_is_corrupted() {
        let (store, _dir) = temp_store();
        fs::write(store.path(), b"{ not valid json !!!}").unwrap();
        assert!(matches!(
            store.fetch("app"),
            Err(StorageError::Corrupted { .. })
        ));
        assert!(matches!(
            store.update("app", 1),
            Err(StorageError::Corrupted { .. })
        ));
    }

    #[test]
    fn checksum_is_deterministic() {
        let mut a = BTreeMap::new();
        a.insert("b".to_string(), 2);
        a.insert("a".to_string(), 1);
        let mut b = BTreeMap::new();
        b.insert("a".to_string(), 1);
        b.insert("b".to_string(), 2);
        let ha = counters_checksum(&a).unwrap();
        assert_eq!(ha, counters_checksum(&b).unwrap());
        assert_eq!(ha.len(), 64, "SHA-256 hex string must be 64 chars");
    }

    // ── MemoryStore ─────────────────────────────────────────────────

    #[test]
    fn memory_store_injects_failures() {
        let store = MemoryStore::with_counter("app", 4);
        store.fail_with("disk full");
        match store.update("app", 5) {
            Err(StorageError::Rejected(message)) => assert_eq!(message, "disk full"),
            other => panic!("Expected Rejected, got: {:?}", other),
        }
        assert_eq!(store.get("app"), Some(4));

        store.recover();
        store.update("app", 5).unwrap();
        assert_eq!(store.fetch("app").unwrap(), 5);
    }

    #[test]
    fn open_store_honours_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::File,
            path: Some(dir.path().join("counter.json")),
            counter: "app".to_string(),
        };
        let store = open_store(&config).unwrap();
        store.update("app", 9).unwrap();
        assert!(dir.path().join("counter.json").exists());

        let memory = open_store(&StorageConfig {
            backend: StorageBackend::Memory,
            ..config
        })
        .unwrap();
        assert_eq!(memory.fetch("app").unwrap(), 0);
    }
}
