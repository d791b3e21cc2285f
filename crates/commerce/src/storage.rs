//! Key-value persistence substrate.
//!
//! Each slot holds one serialized document. The cart lives in
//! [`CART_STORAGE_KEY`] and the order history in [`ORDER_HISTORY_KEY`].
//!
//! Writes are synchronous: a mutation that triggers a save returns only after
//! the store has accepted (or rejected) the new document.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Slot holding the serialized cart.
pub const CART_STORAGE_KEY: &str = "shopping_cart";

/// Slot holding the serialized order history.
pub const ORDER_HISTORY_KEY: &str = "order_history";

/// Errors that can occur when reading or writing a slot.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying file operation failed.
    #[error("I/O error on slot {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    /// The key contains characters that are not allowed in slot names.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// The in-memory store lock was poisoned.
    #[error("storage lock poisoned")]
    LockPoisoned,

    /// The store refused the write.
    #[error("write rejected for slot {0}")]
    WriteRejected(String),
}

/// Persistence failures that are recovered locally rather than surfaced.
///
/// Load failures leave the owner empty; write failures leave the in-memory
/// state authoritative. Both are logged with this type as the error value.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The slot could not be read or decoded.
    #[error("failed to load slot {key}: {reason}")]
    LoadFailed { key: &'static str, reason: String },

    /// The slot could not be written.
    #[error("failed to write slot {key}: {reason}")]
    WriteFailed { key: &'static str, reason: String },
}

/// A get/set/delete key-value store holding one document per key.
pub trait KeyValueStore: Send + Sync {
    /// Read the document stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot exists but cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document could not be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the document stored under `key`. Removing a missing slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot exists but cannot be removed.
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode the document in `key`.
///
/// An absent or blank slot is `Ok(None)`.
///
/// # Errors
///
/// Returns [`PersistenceError::LoadFailed`] if the slot cannot be read or parsed.
pub fn load_document<T: DeserializeOwned>(
    storage: &dyn KeyValueStore,
    key: &'static str,
) -> Result<Option<T>, PersistenceError> {
    let raw = storage.get(key).map_err(|e| PersistenceError::LoadFailed {
        key,
        reason: e.to_string(),
    })?;

    match raw {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| PersistenceError::LoadFailed {
                key,
                reason: e.to_string(),
            }),
        _ => Ok(None),
    }
}

/// Encode `value` and write it to `key`.
///
/// # Errors
///
/// Returns [`PersistenceError::WriteFailed`] if encoding or the write fails.
pub fn save_document<T: Serialize>(
    storage: &dyn KeyValueStore,
    key: &'static str,
    value: &T,
) -> Result<(), PersistenceError> {
    let encoded = serde_json::to_string(value).map_err(|e| PersistenceError::WriteFailed {
        key,
        reason: e.to_string(),
    })?;
    storage
        .set(key, &encoded)
        .map_err(|e| PersistenceError::WriteFailed {
            key,
            reason: e.to_string(),
        })
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store, used for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, String>>,
    reject_writes: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with one slot pre-populated.
    #[must_use]
    pub fn with_slot(key: &str, value: &str) -> Self {
        let store = Self::new();
        if let Ok(mut slots) = store.slots.write() {
            slots.insert(key.to_owned(), value.to_owned());
        }
        store
    }

    /// Make every subsequent `set` and `delete` fail with [`StorageError::WriteRejected`].
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    fn check_writable(&self, key: &str) -> Result<(), StorageError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected(key.to_owned()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let slots = self.slots.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_writable(key)?;
        self.slots
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.check_writable(key)?;
        self.slots
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .remove(key);
        Ok(())
    }
}

// =============================================================================
// File-backed store
// =============================================================================

/// Stores each slot as `<dir>/<key>.json`.
///
/// Writes go to a sibling temporary file that is then renamed over the slot,
/// so a reader never observes a half-written document.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// The directory holding the slot files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.slot_path(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_owned(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.slot_path(key)?;
        let tmp = path.with_extension("json.tmp");
        let io_err = |source: io::Error| StorageError::Io {
            key: key.to_owned(),
            source,
        };
        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.slot_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_owned(),
                source,
            }),
        }
    }
}
