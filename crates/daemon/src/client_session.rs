//! Client side of the key exchange
//!
//! A [`ClientSession`] owns the client key pair (kept in local storage) and,
//! once fetched, the server public key. Bootstrapping never fails: if the
//! server cannot be reached the session records the error and requests go
//! out unsealed until [`ClientSession::refresh_server_key`] succeeds.

use serde::de::DeserializeOwned;
use serde_json::Value;

use common::crypto::{Codec, Key, KeyPair};
use common::key_store::{FileLocalStorage, KeyBackend, KeyStore, LocalStorageBackend};
use common::transport::{parse_counterpart, Channel, TransportError, TransportWrapper};

use crate::books::Book;
use crate::http_server::api::books::{
    AddBookRequest, AddBookResponse, AllBooksRequest, SearchBooksRequest,
};
use crate::http_server::api::client::{ApiClient, ApiError};
use crate::http_server::api::public_key::PublicKeyRequest;

/// Why the session has no usable server key
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to fetch server public key: {0}")]
    Fetch(#[from] ApiError),
    #[error("server returned an empty public key")]
    EmptyServerKey,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

pub struct ClientSession<B = LocalStorageBackend<FileLocalStorage>> {
    client: ApiClient,
    key_store: KeyStore<B>,
    keys: KeyPair,
    server_key: Option<Key>,
    error: Option<SessionError>,
    transport: TransportWrapper,
}

impl<B: KeyBackend> ClientSession<B> {
    /// Load or create the client pair, then try to fetch the server key
    pub async fn bootstrap(client: ApiClient, key_store: KeyStore<B>, codec: Codec) -> Self {
        let keys = key_store.get_or_create();
        tracing::debug!(public_key = %keys.public().fingerprint(), "client keys ready");

        let mut session = Self {
            client,
            key_store,
            keys,
            server_key: None,
            error: None,
            transport: TransportWrapper::new(codec),
        };
        session.refresh_server_key().await;
        session
    }

    /// Fetch the server public key again. On failure the previous key (if
    /// any) is kept and the error recorded.
    pub async fn refresh_server_key(&mut self) -> Option<&Key> {
        match self.client.call(PublicKeyRequest).await {
            Ok(response) => match parse_counterpart(&response.public_key) {
                Some(key) => {
                    tracing::info!(kind = %key.kind(), "fetched server public key");
                    self.server_key = Some(key);
                    self.error = None;
                }
                None => {
                    tracing::warn!("server returned an empty public key");
                    self.error = Some(SessionError::EmptyServerKey);
                }
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    unreachable = e.is_unreachable(),
                    "failed to fetch server public key, requests will not be sealed"
                );
                self.error = Some(SessionError::Fetch(e));
            }
        }
        self.server_key.as_ref()
    }

    /// Replace the client pair with a fresh one and persist it
    pub fn regenerate_keys(&mut self) -> &KeyPair {
        self.keys = self.key_store.regenerate();
        &self.keys
    }

    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    pub fn server_key(&self) -> Option<&Key> {
        self.server_key.as_ref()
    }

    /// Error from the last server key fetch, if it failed
    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    /// Whether requests will be sealed
    pub fn is_sealed(&self) -> bool {
        self.server_key.is_some()
    }

    pub fn channel(&self) -> Channel<'_> {
        self.transport.channel(&self.keys, self.server_key.as_ref())
    }

    pub async fn add_book(&self, book: &Book) -> Result<AddBookResponse, ClientError> {
        let body = self.channel().seal_request(book)?;
        let reply = self.client.call(AddBookRequest { body }).await?;
        self.open(reply)
    }

    pub async fn all_books(&self) -> Result<Vec<Book>, ClientError> {
        let request = AllBooksRequest {
            client_public_key: self.header_key(),
        };
        let reply = self.client.call(request).await?;
        self.open(reply)
    }

    pub async fn search_books(&self, query: &str) -> Result<Vec<Book>, ClientError> {
        let request = SearchBooksRequest {
            query: query.to_string(),
            client_public_key: self.header_key(),
        };
        let reply = self.client.call(request).await?;
        self.open(reply)
    }

    /// Our public key for body-less requests, only once replies can be sealed
    fn header_key(&self) -> Option<String> {
        self.server_key
            .as_ref()
            .map(|_| self.keys.public_key().to_string())
    }

    fn open<T: DeserializeOwned>(&self, reply: Value) -> Result<T, ClientError> {
        let opened = self.transport.channel(&self.keys, None).open(reply)?;
        if let Some(integrity) = opened.integrity {
            tracing::debug!(?integrity, "opened sealed reply");
        }
        Ok(opened.value)
    }
}

#[cfg(test)]
mod tests {
    use common::crypto::KeyStrategy;
    use common::key_store::{LocalStorage, MemoryLocalStorage, CLIENT_KEYS_STORAGE_KEY};
    use url::Url;

    use super::*;

    fn unreachable_client() -> ApiClient {
        // port 9 (discard) on localhost is not expected to be listening
        ApiClient::new(&Url::parse("http://127.0.0.1:9").unwrap()).unwrap()
    }

    fn memory_store(storage: &MemoryLocalStorage) -> KeyStore<LocalStorageBackend<MemoryLocalStorage>> {
        KeyStore::new(
            LocalStorageBackend::new(storage.clone()),
            KeyStrategy::DerivedHash,
        )
    }

    #[tokio::test]
    async fn test_bootstrap_degrades_without_server() {
        let storage = MemoryLocalStorage::default();
        let session =
            ClientSession::bootstrap(unreachable_client(), memory_store(&storage), Codec::default())
                .await;

        assert!(session.error().is_some());
        assert!(session.server_key().is_none());
        assert!(!session.is_sealed());
        assert!(!session.channel().is_sealed());
        assert!(storage.get_item(CLIENT_KEYS_STORAGE_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_keys_reused_across_sessions() {
        let storage = MemoryLocalStorage::default();
        let first =
            ClientSession::bootstrap(unreachable_client(), memory_store(&storage), Codec::default())
                .await;
        let second =
            ClientSession::bootstrap(unreachable_client(), memory_store(&storage), Codec::default())
                .await;
        assert_eq!(first.keys(), second.keys());
    }

    #[tokio::test]
    async fn test_regenerate_keys() {
        let storage = MemoryLocalStorage::default();
        let mut session =
            ClientSession::bootstrap(unreachable_client(), memory_store(&storage), Codec::default())
                .await;
        let before = session.keys().clone();
        let after = session.regenerate_keys().clone();
        assert_ne!(before, after);

        let stored = storage.get_item(CLIENT_KEYS_STORAGE_KEY).unwrap().unwrap();
        let stored: KeyPair = serde_json::from_str(&stored).unwrap();
        assert_eq!(stored, after);
    }
}
