//! Persistence for a principal's own key pair
//!
//! A [`KeyStore`] owns exactly one [`KeyPair`] record in a [`KeyBackend`].
//! Reading never fails from the caller's point of view: an absent, corrupt
//! or incomplete record is replaced by a freshly generated pair, and a pair
//! that cannot be written back is still handed out.

mod file;
mod local_storage;

pub use file::FileBackend;
pub use local_storage::{
    FileLocalStorage, LocalStorage, LocalStorageBackend, MemoryLocalStorage,
    CLIENT_KEYS_STORAGE_KEY,
};

use crate::crypto::{KeyPair, KeyStrategy};

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed key record: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Somewhere a single serialized key record can live
pub trait KeyBackend: Send + Sync {
    /// The stored record, or `None` if nothing has been written yet
    fn load(&self) -> Result<Option<String>, KeyStoreError>;
    fn save(&self, record: &str) -> Result<(), KeyStoreError>;
    /// Human readable location, for logs and the CLI
    fn describe(&self) -> String;
}

#[derive(Debug)]
pub struct KeyStore<B> {
    backend: B,
    strategy: KeyStrategy,
}

impl<B: KeyBackend> KeyStore<B> {
    pub fn new(backend: B, strategy: KeyStrategy) -> Self {
        Self { backend, strategy }
    }

    /// Read and validate the stored record without generating anything
    pub fn load(&self) -> Result<Option<KeyPair>, KeyStoreError> {
        match self.backend.load()? {
            Some(record) => Ok(Some(serde_json::from_str(&record)?)),
            None => Ok(None),
        }
    }

    /// The stored pair, or a freshly generated and persisted one.
    ///
    /// A stored pair is returned as-is even when its kind differs from the
    /// configured strategy.
    pub fn get_or_create(&self) -> KeyPair {
        match self.load() {
            Ok(Some(pair)) => {
                tracing::debug!(
                    location = %self.backend.describe(),
                    kind = %pair.kind(),
                    "loaded stored key pair"
                );
                if pair.kind() != self.strategy.kind() {
                    tracing::info!(
                        stored = %pair.kind(),
                        configured = %self.strategy,
                        "stored key pair differs from configured strategy, keeping it"
                    );
                }
                return pair;
            }
            Ok(None) => {
                tracing::info!(
                    location = %self.backend.describe(),
                    "no stored key pair, generating a new one"
                );
            }
            Err(e) => {
                tracing::warn!(
                    location = %self.backend.describe(),
                    error = %e,
                    "stored key pair unusable, generating a new one"
                );
            }
        }

        self.create_and_save()
    }

    /// Generate and persist a new pair, replacing whatever was stored.
    /// A write failure is logged and the new pair returned anyway.
    pub fn regenerate(&self) -> KeyPair {
        tracing::info!(location = %self.backend.describe(), "regenerating key pair");
        self.create_and_save()
    }

    /// Like [`KeyStore::regenerate`] but reports a write failure
    pub fn try_regenerate(&self) -> Result<KeyPair, KeyStoreError> {
        let pair = self.strategy.generate();
        self.persist(&pair)?;
        Ok(pair)
    }

    fn create_and_save(&self) -> KeyPair {
        let pair = self.strategy.generate();
        if let Err(e) = self.persist(&pair) {
            tracing::error!(
                location = %self.backend.describe(),
                error = %e,
                "failed to persist key pair, continuing with in-memory keys"
            );
        }
        pair
    }

    fn persist(&self, pair: &KeyPair) -> Result<(), KeyStoreError> {
        let record = serde_json::to_string_pretty(pair)?;
        self.backend.save(&record)
    }
}
