use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;

use common::crypto::{Codec, KeyKind, KeyPair, KeyStrategy};
use common::key_store::{FileBackend, KeyStore};
use common::transport::TransportWrapper;

use crate::books::BookStore;
use crate::service_config::Config;

/// Main service state, shared by every handler
#[derive(Clone)]
pub struct State {
    /// current server pair, replaced whole on rotation
    keys: Arc<RwLock<Arc<KeyPair>>>,
    key_store: Option<Arc<KeyStore<FileBackend>>>,
    /// held across persist and swap so the file and memory agree
    rotation: Arc<Mutex<()>>,
    strategy: KeyStrategy,
    transport: TransportWrapper,
    books: BookStore,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        let codec = Codec::new(config.signature_policy);

        let Some(keys_path) = config.keys_path.clone() else {
            tracing::info!("no key file configured, server keys live in memory only");
            let strategy = config.key_strategy;
            let keys = tokio::task::spawn_blocking(move || strategy.try_generate()).await??;
            return Ok(Self::new(keys, codec));
        };

        let key_store = Arc::new(KeyStore::new(
            FileBackend::new(&keys_path),
            config.key_strategy,
        ));
        let store = key_store.clone();
        let keys = tokio::task::spawn_blocking(move || store.get_or_create()).await?;
        tracing::info!(
            path = %keys_path.display(),
            kind = %keys.kind(),
            "server keys initialized"
        );

        Ok(Self {
            keys: Arc::new(RwLock::new(Arc::new(keys))),
            key_store: Some(key_store),
            rotation: Arc::default(),
            strategy: config.key_strategy,
            transport: TransportWrapper::new(codec),
            books: BookStore::default(),
        })
    }

    /// State over an in-memory pair, nothing is persisted
    pub fn new(keys: KeyPair, codec: Codec) -> Self {
        Self {
            strategy: match keys.kind() {
                KeyKind::ServerPem => KeyStrategy::Rsa,
                KeyKind::OpaqueToken => KeyStrategy::DerivedHash,
            },
            keys: Arc::new(RwLock::new(Arc::new(keys))),
            key_store: None,
            rotation: Arc::default(),
            transport: TransportWrapper::new(codec),
            books: BookStore::default(),
        }
    }

    /// Snapshot of the current server pair
    pub fn keys(&self) -> Arc<KeyPair> {
        self.keys.read().clone()
    }

    /// Generate a new server pair, persist it if a key file is configured,
    /// and make it current. In-flight requests may still finish with the
    /// old pair.
    pub async fn regenerate_keys(&self) -> Result<Arc<KeyPair>, StateSetupError> {
        let _rotation = self.rotation.lock().await;
        let keys = match self.key_store.clone() {
            Some(store) => tokio::task::spawn_blocking(move || store.regenerate()).await?,
            None => {
                let strategy = self.strategy;
                tokio::task::spawn_blocking(move || strategy.try_generate()).await??
            }
        };

        let keys = Arc::new(keys);
        *self.keys.write() = keys.clone();
        tracing::info!(kind = %keys.kind(), "server keys rotated");
        Ok(keys)
    }

    pub fn transport(&self) -> &TransportWrapper {
        &self.transport
    }

    pub fn books(&self) -> &BookStore {
        &self.books
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("key generation task failed: {0}")]
    KeyTask(#[from] tokio::task::JoinError),
    #[error("key generation failed: {0}")]
    KeyGeneration(#[from] common::crypto::KeyGenerationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::crypto::SignaturePolicy;

    fn derived_config() -> Config {
        Config {
            key_strategy: KeyStrategy::DerivedHash,
            ..Config::on_port(0)
        }
    }

    #[tokio::test]
    async fn test_in_memory_rotation_replaces_pair() {
        let state = State::from_config(&derived_config()).await.unwrap();
        let before = state.keys();
        let held = state.clone();

        let after = state.regenerate_keys().await.unwrap();
        assert_ne!(before.public_key(), after.public_key());
        // clones share the slot
        assert_eq!(held.keys().public_key(), after.public_key());
        // a snapshot taken earlier is unaffected
        assert_ne!(before.public_key(), held.keys().public_key());
    }

    #[tokio::test]
    async fn test_file_backed_keys_persist() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            keys_path: Some(temp.path().join("keys.json")),
            ..derived_config()
        };

        let first = State::from_config(&config).await.unwrap();
        let second = State::from_config(&config).await.unwrap();
        assert_eq!(first.keys(), second.keys());

        let rotated = first.regenerate_keys().await.unwrap();
        let third = State::from_config(&config).await.unwrap();
        assert_eq!(third.keys(), rotated);
    }

    #[tokio::test]
    async fn test_concurrent_rotations_keep_file_and_memory_in_step() {
        let temp = tempfile::tempdir().unwrap();
        let keys_path = temp.path().join("keys.json");
        let config = Config {
            keys_path: Some(keys_path.clone()),
            ..derived_config()
        };
        let state = State::from_config(&config).await.unwrap();

        let rotations = (0..8).map(|_| {
            let state = state.clone();
            tokio::spawn(async move { state.regenerate_keys().await.unwrap() })
        });
        futures::future::join_all(rotations).await;

        let on_disk = KeyStore::new(FileBackend::new(&keys_path), KeyStrategy::DerivedHash)
            .load()
            .unwrap()
            .unwrap();
        assert_eq!(*state.keys(), on_disk);
    }

    #[test]
    fn test_new_uses_given_codec() {
        let pair = KeyStrategy::DerivedHash.generate();
        let state = State::new(pair.clone(), Codec::new(SignaturePolicy::Enforce));
        assert_eq!(*state.keys(), pair);
        assert_eq!(state.transport().codec().policy(), SignaturePolicy::Enforce);
    }
}
