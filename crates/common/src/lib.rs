/**
 * Key material, key generation and the
 *  envelope codec.
 */
pub mod crypto;
/**
 * Persistence of a principal's own key pair,
 *  on disk for the server and in local
 *  storage for the client.
 */
pub mod key_store;
/**
 * Sealing and opening of request and
 *  response bodies.
 */
pub mod transport;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::crypto::{
        Codec, Decoded, Envelope, Integrity, Key, KeyKind, KeyPair, KeyStrategy, SignaturePolicy,
    };
    pub use crate::key_store::{
        FileBackend, FileLocalStorage, KeyBackend, KeyStore, KeyStoreError, LocalStorage,
        LocalStorageBackend, MemoryLocalStorage,
    };
    pub use crate::transport::{
        Channel, Opened, SealedPayload, TransportError, TransportWrapper,
        CLIENT_PUBLIC_KEY_HEADER,
    };
    pub use crate::version::build_info;
}
