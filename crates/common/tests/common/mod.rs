//! Shared test utilities for key exchange integration tests
#![allow(dead_code)]

use common::crypto::KeyStrategy;
use common::key_store::{FileBackend, FileLocalStorage, KeyStore, LocalStorageBackend};
use tempfile::TempDir;

pub type ServerStore = KeyStore<FileBackend>;
pub type ClientStore = KeyStore<LocalStorageBackend<FileLocalStorage>>;

/// A server key store and a client key store sharing one temp dir
pub fn setup_stores(server_strategy: KeyStrategy) -> (ServerStore, ClientStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let server = server_store(&temp_dir, server_strategy);
    let client = client_store(&temp_dir);
    (server, client, temp_dir)
}

pub fn server_store(dir: &TempDir, strategy: KeyStrategy) -> ServerStore {
    KeyStore::new(FileBackend::new(dir.path().join("keys.json")), strategy)
}

/// Client pairs are always derived-hash: they travel in a header
pub fn client_store(dir: &TempDir) -> ClientStore {
    let storage = FileLocalStorage::new(dir.path().join("local_storage.json"));
    KeyStore::new(LocalStorageBackend::new(storage), KeyStrategy::DerivedHash)
}
