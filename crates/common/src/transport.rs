//! Sealing and opening request/response bodies
//!
//! A [`Channel`] is one side's view of a conversation: its own pair and,
//! if known, the counterpart's public key. With a counterpart every body is
//! sealed into `{"encryptedData": <envelope>}` (requests also carry
//! `"clientPublicKey"`); without one bodies travel as plain JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::{Codec, Decoded, Envelope, Integrity, Key, KeyPair};

/// Carries the client public key on requests without a body
pub const CLIENT_PUBLIC_KEY_HEADER: &str = "x-client-public-key";

const ENCRYPTED_DATA_FIELD: &str = "encryptedData";
const LEGACY_DATA_FIELD: &str = "data";
const CLIENT_PUBLIC_KEY_FIELD: &str = "clientPublicKey";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("envelope could not be decoded")]
    Undecodable,
}

/// The sealed wire shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedPayload {
    #[serde(alias = "data")]
    pub encrypted_data: Envelope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_public_key: Option<String>,
}

/// A body after [`Channel::open`]
#[derive(Debug, Clone)]
pub struct Opened<T> {
    pub value: T,
    /// Public key the sender attached, if any
    pub counterpart: Option<Key>,
    /// Whether the body arrived sealed
    pub sealed: bool,
    /// Signature outcome for sealed bodies
    pub integrity: Option<Integrity>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransportWrapper {
    codec: Codec,
}

impl TransportWrapper {
    pub fn new(codec: Codec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn channel<'a>(&self, own: &'a KeyPair, counterpart: Option<&'a Key>) -> Channel<'a> {
        Channel {
            codec: self.codec,
            own,
            counterpart,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Channel<'a> {
    codec: Codec,
    own: &'a KeyPair,
    counterpart: Option<&'a Key>,
}

impl<'a> Channel<'a> {
    /// Whether outgoing bodies will be sealed
    pub fn is_sealed(&self) -> bool {
        self.counterpart.is_some()
    }

    /// Seal a request body, attaching our public key
    pub fn seal_request<T: Serialize>(&self, value: &T) -> Result<Value, TransportError> {
        self.seal(value, Some(self.own.public_key().to_string()))
    }

    pub fn seal_response<T: Serialize>(&self, value: &T) -> Result<Value, TransportError> {
        self.seal(value, None)
    }

    fn seal<T: Serialize>(
        &self,
        value: &T,
        client_public_key: Option<String>,
    ) -> Result<Value, TransportError> {
        let Some(counterpart) = self.counterpart else {
            return Ok(serde_json::to_value(value)?);
        };

        let json = serde_json::to_string(value)?;
        let sealed = SealedPayload {
            encrypted_data: self.codec.encode(&json, counterpart),
            client_public_key,
        };
        Ok(serde_json::to_value(sealed)?)
    }

    /// Open a body that may or may not be sealed
    pub fn open<T: DeserializeOwned>(&self, body: Value) -> Result<Opened<T>, TransportError> {
        let Some((envelope, client_public_key)) = sealed_parts(&body) else {
            return Ok(Opened {
                value: serde_json::from_value(body)?,
                counterpart: None,
                sealed: false,
                integrity: None,
            });
        };

        let (text, integrity) = match self.codec.decode(&envelope, &self.own.private()) {
            Decoded::Plaintext { text, integrity } => (text, integrity),
            Decoded::Failed(_) => return Err(TransportError::Undecodable),
        };

        Ok(Opened {
            value: serde_json::from_str(&text)?,
            counterpart: client_public_key.as_deref().and_then(parse_counterpart),
            sealed: true,
            integrity: Some(integrity),
        })
    }
}

/// A counterpart key received as a bare string (header or body field).
///
/// The material is kept exactly as received; blank input is no key.
pub fn parse_counterpart(raw: &str) -> Option<Key> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(Key::classify(raw))
    }
}

/// The legacy `data` field only counts alongside `clientPublicKey`, so a
/// plain payload with a `data` field of its own is left alone.
fn sealed_parts(body: &Value) -> Option<(Envelope, Option<String>)> {
    let object = body.as_object()?;
    let client_public_key = object
        .get(CLIENT_PUBLIC_KEY_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string);
    let envelope = match object.get(ENCRYPTED_DATA_FIELD) {
        Some(field) => field.as_str()?,
        None if client_public_key.is_some() => object.get(LEGACY_DATA_FIELD)?.as_str()?,
        None => return None,
    };
    Some((Envelope::from(envelope), client_public_key))
}
