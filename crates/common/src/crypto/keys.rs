use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Marker that opens every PEM block
const PEM_BEGIN: &str = "-----BEGIN";
/// Suffix of the label line of every PEM key block
const PEM_KEY_SUFFIX: &str = "KEY-----";

/// Number of characters of key material shown in logs and `Debug` output
const DISPLAY_PREFIX_LEN: usize = 16;

/// Errors that can occur while building keys from raw material
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key record is missing its {0}")]
    MissingField(&'static str),
}

/// The two kinds of key material the codec knows how to use
///
/// The kind selects the codec strategy: PEM keys go through RSA, anything
/// else is used as an HMAC key for the signed Base64 envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// PEM encoded RSA key
    ServerPem,
    /// Opaque string, used as a symmetric signing key
    OpaqueToken,
}

impl KeyKind {
    /// Classify raw key material by looking for PEM delimiters.
    ///
    /// Only used where a bare string crosses a trust boundary (a header, a
    /// legacy record). Keys we generate carry their kind explicitly.
    pub fn classify(material: &str) -> Self {
        if material.contains(PEM_BEGIN) && material.contains(PEM_KEY_SUFFIX) {
            KeyKind::ServerPem
        } else {
            KeyKind::OpaqueToken
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::ServerPem => write!(f, "server-pem"),
            KeyKind::OpaqueToken => write!(f, "opaque-token"),
        }
    }
}

/// One half of a key pair, tagged with its kind
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    kind: KeyKind,
    material: String,
}

impl Key {
    pub fn new(kind: KeyKind, material: impl Into<String>) -> Self {
        Self {
            kind,
            material: material.into(),
        }
    }

    /// Build a key from a bare string, classifying it by content
    pub fn classify(material: impl Into<String>) -> Self {
        let material = material.into();
        Self {
            kind: KeyKind::classify(&material),
            material,
        }
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.material
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.material.as_bytes()
    }

    /// The public half a derived-hash private key maps to.
    ///
    /// Only meaningful for opaque keys: `hex(SHA-256(key))`.
    pub fn derived_public(&self) -> Option<Key> {
        match self.kind {
            KeyKind::OpaqueToken => Some(Key::new(
                KeyKind::OpaqueToken,
                derive_public_hex(&self.material),
            )),
            KeyKind::ServerPem => None,
        }
    }

    /// Short, log-safe prefix of the key material
    pub fn fingerprint(&self) -> String {
        prefix(&self.material, DISPLAY_PREFIX_LEN)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("kind", &self.kind)
            .field("material", &format!("{}...", self.fingerprint()))
            .finish()
    }
}

/// A public/private key pair owned by one principal (client or server)
///
/// On disk and on the wire this is `{ "publicKey", "privateKey", "kind" }`.
/// Records written without `kind` are still accepted; their kind is
/// classified from the private key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KeyRecord", into = "KeyRecord")]
pub struct KeyPair {
    kind: KeyKind,
    public_key: String,
    private_key: String,
}

impl KeyPair {
    pub fn new(kind: KeyKind, public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            kind,
            public_key: public_key.into(),
            private_key: private_key.into(),
        }
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    /// The public half, safe to hand to the counterpart
    pub fn public(&self) -> Key {
        Key::new(self.kind, self.public_key.clone())
    }

    /// The private half, never leaves its owner
    pub fn private(&self) -> Key {
        Key::new(self.kind, self.private_key.clone())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("kind", &self.kind)
            .field("public_key", &format!("{}...", prefix(&self.public_key, DISPLAY_PREFIX_LEN)))
            .finish()
    }
}

/// Serialized shape of a [`KeyPair`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyRecord {
    public_key: Option<String>,
    private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<KeyKind>,
}

impl TryFrom<KeyRecord> for KeyPair {
    type Error = KeyError;

    fn try_from(record: KeyRecord) -> Result<Self, Self::Error> {
        let public_key = record
            .public_key
            .filter(|k| !k.is_empty())
            .ok_or(KeyError::MissingField("publicKey"))?;
        let private_key = record
            .private_key
            .filter(|k| !k.is_empty())
            .ok_or(KeyError::MissingField("privateKey"))?;
        let kind = record
            .kind
            .unwrap_or_else(|| KeyKind::classify(&private_key));

        Ok(KeyPair {
            kind,
            public_key,
            private_key,
        })
    }
}

impl From<KeyPair> for KeyRecord {
    fn from(pair: KeyPair) -> Self {
        KeyRecord {
            public_key: Some(pair.public_key),
            private_key: Some(pair.private_key),
            kind: Some(pair.kind),
        }
    }
}

/// `hex(SHA-256(material))`, the derived-hash public key relation
pub(crate) fn derive_public_hex(material: &str) -> String {
    hex::encode(Sha256::digest(material.as_bytes()))
}

/// First `len` characters of `s`, respecting char boundaries
pub fn prefix(s: &str, len: usize) -> String {
    s.chars().take(len).collect()
}
