//! # Durable Storage
//!
//! Key/value storage shared by the pages of one browser profile, and the
//! session store built on top of it.
//!
//! ## Backends
//!
//! - `MemoryStorage`: lives as long as the process
//! - `FileStorage`: JSON document on disk, rewritten atomically on every write
//!
//! The session record lives under a single fixed key and is overwritten
//! wholesale on every save.

use parking_lot::{Mutex, RwLock};
use relay_types::{Session, StorageError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// String key/value storage, modelled on browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Keys starting with `prefix`, in ascending order.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// In-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

/// File-backed storage.
///
/// The whole map is kept in memory and written to `path` through a temporary
/// file and a rename after every mutation.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or create) the storage file at `path`.
    ///
    /// # Errors
    ///
    /// - `StorageError::Io` - the file exists but cannot be read
    /// - `StorageError::Encode` - the file is not a JSON object of strings
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => {
                serde_json::from_str(&raw).map_err(|e| StorageError::Encode(e.to_string()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StorageError::Io(e.to_string())),
        };

        info!(path = %path.display(), entries = entries.len(), "Opened file storage");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
            }
        }
        let encoded =
            serde_json::to_string_pretty(entries).map_err(|e| StorageError::Encode(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, encoded).map_err(|e| StorageError::Io(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .entries
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Loads and saves the session record under a fixed key.
///
/// A store is usable between `open()` and `close()`; saving after close fails
/// with `StorageError::Closed`.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    key: String,
    open: AtomicBool,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            open: AtomicBool::new(false),
        }
    }

    /// Open the store and return the persisted session, creating and
    /// persisting a fresh one if none exists or the record is unreadable.
    ///
    /// # Errors
    ///
    /// Propagates storage errors from reading or writing the record.
    pub fn open(&self) -> Result<Session, StorageError> {
        self.open.store(true, Ordering::SeqCst);

        if let Some(session) = self.load()? {
            debug!(session_id = %session.session_id, "Loaded persisted session");
            return Ok(session);
        }

        let session = Session::new();
        self.save(&session)?;
        info!(session_id = %session.session_id, "Created new session");
        Ok(session)
    }

    /// Read the persisted session without opening the store.
    ///
    /// An unreadable record is reported as absent.
    pub fn load(&self) -> Result<Option<Session>, StorageError> {
        let Some(raw) = self.storage.get(&self.key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Discarding unreadable session record");
                Ok(None)
            }
        }
    }

    /// Overwrite the persisted session.
    pub fn save(&self, session: &Session) -> Result<(), StorageError> {
        if !self.is_open() {
            return Err(StorageError::Closed);
        }
        let encoded =
            serde_json::to_string(session).map_err(|e| StorageError::Encode(e.to_string()))?;
        self.storage.set(&self.key, &encoded)
    }

    pub fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            debug!(key = %self.key, "Session store closed");
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }
}
