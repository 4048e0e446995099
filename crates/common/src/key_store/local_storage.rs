//! Durable key/value storage for the client side
//!
//! Mirrors the browser `localStorage` contract: string keys, string values,
//! one shared document. [`FileLocalStorage`] keeps the document as a JSON
//! object on disk, [`MemoryLocalStorage`] keeps it in memory.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{KeyBackend, KeyStoreError};

/// Storage key the client key record lives under
pub const CLIENT_KEYS_STORAGE_KEY: &str = "client_keys";

pub trait LocalStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, KeyStoreError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), KeyStoreError>;
    fn remove_item(&self, key: &str) -> Result<(), KeyStoreError>;
}

type Document = BTreeMap<String, String>;

/// A JSON object document on disk
#[derive(Debug)]
pub struct FileLocalStorage {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileLocalStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Document, KeyStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(Document::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_document(&self, document: &Document) -> Result<(), KeyStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(document)?)?;
        Ok(())
    }

    /// Current document for a write; a corrupt one is discarded
    fn document_for_update(&self) -> Result<Document, KeyStoreError> {
        match self.read_document() {
            Err(KeyStoreError::Malformed(e)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "local storage document is corrupt, starting a new one"
                );
                Ok(Document::new())
            }
            other => other,
        }
    }
}

impl LocalStorage for FileLocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, KeyStoreError> {
        let _guard = self.lock.lock();
        Ok(self.read_document()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), KeyStoreError> {
        let _guard = self.lock.lock();
        let mut document = self.document_for_update()?;
        document.insert(key.to_string(), value.to_string());
        self.write_document(&document)
    }

    fn remove_item(&self, key: &str) -> Result<(), KeyStoreError> {
        let _guard = self.lock.lock();
        let mut document = self.document_for_update()?;
        if document.remove(key).is_some() {
            self.write_document(&document)?;
        }
        Ok(())
    }
}

/// In-memory storage; clones share the same items
#[derive(Debug, Clone, Default)]
pub struct MemoryLocalStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl LocalStorage for MemoryLocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, KeyStoreError> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), KeyStoreError> {
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), KeyStoreError> {
        self.items.lock().remove(key);
        Ok(())
    }
}

/// Keeps a key record under one entry of a [`LocalStorage`]
#[derive(Debug, Clone)]
pub struct LocalStorageBackend<S> {
    storage: S,
    key: String,
}

impl<S: LocalStorage> LocalStorageBackend<S> {
    /// Backend over the client key entry
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            key: CLIENT_KEYS_STORAGE_KEY.to_string(),
        }
    }
}

impl<S: LocalStorage> KeyBackend for LocalStorageBackend<S> {
    fn load(&self) -> Result<Option<String>, KeyStoreError> {
        self.storage.get_item(&self.key)
    }

    fn save(&self, record: &str) -> Result<(), KeyStoreError> {
        self.storage.set_item(&self.key, record)
    }

    fn describe(&self) -> String {
        format!("local storage entry '{}'", self.key)
    }
}
