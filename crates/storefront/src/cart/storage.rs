//! Device-local key-value storage for the cart blob.
//!
//! The cart lives in exactly one serialized blob under a well-known key,
//! plus one transient flag key consumed by the orders screen after a
//! purchase. Storage is process-local and single-writer-by-convention;
//! nothing here attempts cross-device consistency.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

/// Well-known storage keys.
pub mod keys {
    /// The serialized cart (a JSON array of lines).
    pub const CART: &str = "cart";
    /// Set after a successful purchase; consumed once by the orders screen
    /// to show its success banner.
    pub const PURCHASE_FLAG: &str = "purchase_success";
}

/// Errors from local storage.
///
/// Reads degrade to empty state at the call site and are never fatal;
/// writes surface to the caller, since silently losing a cart mutation is
/// worse than showing an error.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Could not read a value.
    #[error("failed to read `{key}` from local storage: {reason}")]
    Read { key: String, reason: String },

    /// Could not write (or remove) a value.
    #[error("failed to write `{key}` to local storage: {reason}")]
    Write { key: String, reason: String },
}

/// String key-value storage for device-local state.
///
/// One implementation per target platform, selected at the composition
/// root; the cart store never knows which one it got.
pub trait CartStorage: Send + Sync {
    /// Read the value under `key`; `None` when the key has never been
    /// written (or was removed).
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Read` when the value exists but cannot
    /// be read.
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Write` when the value cannot be stored.
    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    /// Remove the value under `key`; removing a missing key is fine.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Write` when the removal fails.
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

// =============================================================================
// FileStorage
// =============================================================================

/// File-backed storage: one file per key under a data directory.
///
/// Writes go through a temp file plus rename, so a crash mid-write leaves
/// the previous blob intact rather than a truncated one.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `dir`. The directory is created lazily on
    /// the first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl CartStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::Read {
                key: key.to_owned(),
                reason: e.to_string(),
            }),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let write_err = |e: std::io::Error| PersistenceError::Write {
            key: key.to_owned(),
            reason: e.to_string(),
        };

        std::fs::create_dir_all(&self.dir).map_err(write_err)?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(write_err)?;
        std::fs::rename(&tmp, &path).map_err(write_err)
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::Write {
                key: key.to_owned(),
                reason: e.to_string(),
            }),
        }
    }
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-memory storage for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
