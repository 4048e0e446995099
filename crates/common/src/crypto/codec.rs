//! Envelope codec
//!
//! Turns plaintext into an [`Envelope`] and back. The strategy is chosen by
//! the kind of key handed in:
//!
//! - [`KeyKind::OpaqueToken`]: `hex(HMAC-SHA256(plaintext))--base64(plaintext)`.
//!   The payload is only Base64, not encrypted. The signature is advisory
//!   unless the codec runs with [`SignaturePolicy::Enforce`], which also
//!   refuses envelopes that arrive without a signature.
//! - [`KeyKind::ServerPem`]: RSA-OAEP (SHA-256) ciphertext, Base64 encoded.
//!
//! Neither operation raises. Encoding falls back to bare Base64, decoding
//! walks a fallback chain (strategy, then raw Base64) and finally reports
//! [`Decoded::Failed`] carrying the untouched input.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::keys::{Key, KeyKind};

type HmacSha256 = Hmac<Sha256>;

/// Separates the signature from the payload in a signed envelope
pub const SIGNATURE_SEPARATOR: &str = "--";

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("unusable PEM key: {0}")]
    Pem(String),
    #[error("rsa operation failed: {0}")]
    Rsa(#[from] rsa::Error),
}

/// What to do when a signed envelope does not verify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignaturePolicy {
    /// Log the mismatch and return the payload anyway
    #[default]
    Advisory,
    /// Treat the envelope as undecodable
    Enforce,
}

impl fmt::Display for SignaturePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignaturePolicy::Advisory => write!(f, "advisory"),
            SignaturePolicy::Enforce => write!(f, "enforce"),
        }
    }
}

impl FromStr for SignaturePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "advisory" => Ok(SignaturePolicy::Advisory),
            "enforce" => Ok(SignaturePolicy::Enforce),
            other => Err(format!(
                "unknown signature policy '{}', expected 'advisory' or 'enforce'",
                other
            )),
        }
    }
}

/// Encoded wire representation of a payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(String);

impl Envelope {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this looks like a signed (symmetric) envelope
    pub fn is_signed(&self) -> bool {
        self.0.contains(SIGNATURE_SEPARATOR)
    }
}

impl From<String> for Envelope {
    fn from(s: String) -> Self {
        Envelope(s)
    }
}

impl From<&str> for Envelope {
    fn from(s: &str) -> Self {
        Envelope(s.to_string())
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How much the recovered plaintext can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integrity {
    /// A signature was present and matched
    Verified,
    /// A signature was present and did not match
    Mismatch,
    /// Decrypted through the asymmetric path, which carries no signature
    Unsigned,
    /// Recovered only by the raw Base64 fallback; nothing protected it
    Unprotected,
}

/// Outcome of [`Codec::decode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Plaintext { text: String, integrity: Integrity },
    /// Every strategy failed; carries the original input
    Failed(String),
}

impl Decoded {
    fn unsigned(text: String) -> Self {
        Decoded::Plaintext {
            text,
            integrity: Integrity::Unsigned,
        }
    }

    fn unprotected(text: String) -> Self {
        Decoded::Plaintext {
            text,
            integrity: Integrity::Unprotected,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Decoded::Plaintext { text, .. } => Some(text),
            Decoded::Failed(_) => None,
        }
    }

    pub fn integrity(&self) -> Option<Integrity> {
        match self {
            Decoded::Plaintext { integrity, .. } => Some(*integrity),
            Decoded::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Decoded::Failed(_))
    }

    /// `Ok(plaintext)` or `Err(original input)`
    pub fn into_result(self) -> Result<String, String> {
        match self {
            Decoded::Plaintext { text, .. } => Ok(text),
            Decoded::Failed(original) => Err(original),
        }
    }

    /// The plaintext, or the original input when decoding failed.
    ///
    /// A caller cannot tell the two apart from the returned string alone;
    /// prefer [`Decoded::into_result`].
    pub fn into_text(self) -> String {
        match self {
            Decoded::Plaintext { text, .. } => text,
            Decoded::Failed(original) => original,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Codec {
    policy: SignaturePolicy,
}

impl Codec {
    pub fn new(policy: SignaturePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SignaturePolicy {
        self.policy
    }

    /// Encode `plaintext` for the holder of `key`. Never fails.
    pub fn encode(&self, plaintext: &str, key: &Key) -> Envelope {
        self.try_encode(plaintext, key).unwrap_or_else(|e| {
            tracing::error!(
                error = %e,
                kind = %key.kind(),
                "encoding failed, falling back to bare base64"
            );
            Envelope(BASE64.encode(plaintext))
        })
    }

    /// Encode without the bare Base64 fallback
    pub fn try_encode(&self, plaintext: &str, key: &Key) -> Result<Envelope, CodecError> {
        match key.kind() {
            KeyKind::OpaqueToken => Ok(encode_signed(plaintext, key)),
            KeyKind::ServerPem => encode_rsa(plaintext, key),
        }
    }

    /// Decode an envelope with `key`. Never fails; see [`Decoded`].
    pub fn decode(&self, envelope: &Envelope, key: &Key) -> Decoded {
        let input = envelope.as_str();
        tracing::debug!(len = input.len(), kind = %key.kind(), "decoding envelope");

        let attempt = match key.kind() {
            KeyKind::OpaqueToken => self.decode_signed(input, key),
            KeyKind::ServerPem => decode_rsa(input, key).map(Decoded::unsigned),
        };

        let decoded = match attempt {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(error = %e, "decoding failed, trying direct base64 decode");
                match decode_raw(input) {
                    Ok(text) => Decoded::unprotected(text),
                    Err(e) => {
                        tracing::error!(error = %e, "base64 fallback failed, returning input");
                        return Decoded::Failed(input.to_string());
                    }
                }
            }
        };

        // a stripped signature must not get past the mismatch check
        if self.policy == SignaturePolicy::Enforce
            && key.kind() == KeyKind::OpaqueToken
            && decoded.integrity() == Some(Integrity::Unprotected)
        {
            tracing::warn!("envelope carries no signature, rejecting envelope");
            return Decoded::Failed(input.to_string());
        }

        decoded
    }

    fn decode_signed(&self, input: &str, key: &Key) -> Result<Decoded, CodecError> {
        if !input.contains(SIGNATURE_SEPARATOR) {
            tracing::debug!("envelope has no separator, trying direct base64 decode");
            return Ok(Decoded::unprotected(decode_raw(input)?));
        }

        let parts: Vec<&str> = input.split(SIGNATURE_SEPARATOR).collect();
        let [signature, payload] = parts.as_slice() else {
            tracing::debug!(
                parts = parts.len(),
                "envelope has an invalid format, trying direct base64 decode"
            );
            return Ok(Decoded::unprotected(decode_raw(input)?));
        };

        let text = String::from_utf8(BASE64.decode(payload)?)?;

        if verify_signature(signature, &text, key) {
            return Ok(Decoded::Plaintext {
                text,
                integrity: Integrity::Verified,
            });
        }

        match self.policy {
            SignaturePolicy::Advisory => {
                tracing::warn!("signature verification failed, still returning decoded data");
                Ok(Decoded::Plaintext {
                    text,
                    integrity: Integrity::Mismatch,
                })
            }
            SignaturePolicy::Enforce => {
                tracing::warn!("signature verification failed, rejecting envelope");
                Ok(Decoded::Failed(input.to_string()))
            }
        }
    }
}

fn mac_for(key: &Key) -> HmacSha256 {
    HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size")
}

/// `hex(HMAC-SHA256(key, message))`
pub fn sign(message: &str, key: &Key) -> String {
    let mut mac = mac_for(key);
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Check a hex signature against the key itself and, for an opaque key,
/// against its derived public counterpart. The latter lets the holder of a
/// derived-hash private key verify envelopes signed with its public key.
fn verify_signature(signature: &str, message: &str, key: &Key) -> bool {
    let Ok(tag) = hex::decode(signature) else {
        return false;
    };

    std::iter::once(key.clone())
        .chain(key.derived_public())
        .any(|candidate| {
            let mut mac = mac_for(&candidate);
            mac.update(message.as_bytes());
            mac.verify_slice(&tag).is_ok()
        })
}

fn encode_signed(plaintext: &str, key: &Key) -> Envelope {
    let signature = sign(plaintext, key);
    let payload = BASE64.encode(plaintext);
    Envelope(format!("{}{}{}", signature, SIGNATURE_SEPARATOR, payload))
}

fn encode_rsa(plaintext: &str, key: &Key) -> Result<Envelope, CodecError> {
    let public = parse_public(key.as_str())?;
    let ciphertext = public.encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext.as_bytes())?;
    Ok(Envelope(BASE64.encode(ciphertext)))
}

fn decode_rsa(input: &str, key: &Key) -> Result<String, CodecError> {
    let private = parse_private(key.as_str())?;
    let ciphertext = BASE64.decode(input)?;
    let plaintext = private.decrypt(Oaep::new::<Sha256>(), &ciphertext)?;
    Ok(String::from_utf8(plaintext)?)
}

fn decode_raw(input: &str) -> Result<String, CodecError> {
    Ok(String::from_utf8(BASE64.decode(input)?)?)
}

/// Accepts SPKI or PKCS#1 public keys, or a private key whose public half
/// is then used.
fn parse_public(pem: &str) -> Result<RsaPublicKey, CodecError> {
    let pem = pem.trim();
    if let Ok(public) = RsaPublicKey::from_public_key_pem(pem) {
        return Ok(public);
    }
    if let Ok(public) = RsaPublicKey::from_pkcs1_pem(pem) {
        return Ok(public);
    }
    parse_private(pem)
        .map(|private| RsaPublicKey::from(&private))
        .map_err(|_| CodecError::Pem("not an RSA public or private key".to_string()))
}

fn parse_private(pem: &str) -> Result<RsaPrivateKey, CodecError> {
    let pem = pem.trim();
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| CodecError::Pem(e.to_string()))
}

#[cfg(test)]
mod test {
    use std::sync::OnceLock;

    use super::*;
    use crate::crypto::{KeyPair, KeyStrategy};

    fn rsa_pair() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| KeyStrategy::Rsa.generate())
    }

    fn opaque(s: &str) -> Key {
        Key::new(KeyKind::OpaqueToken, s)
    }

    #[test]
    fn test_signed_envelope_format() {
        let codec = Codec::default();
        let envelope = codec.encode("Hello, World!", &opaque("test-key"));

        let parts: Vec<&str> = envelope.as_str().split(SIGNATURE_SEPARATOR).collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 64);
        assert!(parts[0].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(BASE64.decode(parts[1]).unwrap(), b"Hello, World!");
        assert!(envelope.is_signed());
    }

    #[test]
    fn test_signed_round_trip() {
        let codec = Codec::default();
        let key = opaque("test-key");
        for plaintext in ["Hello, World!", "", "{\"name\":\"Alice\",\"age\":30}", "ünïcødé 📚"] {
            let decoded = codec.decode(&codec.encode(plaintext, &key), &key);
            assert_eq!(decoded.text(), Some(plaintext));
            assert_eq!(decoded.integrity(), Some(Integrity::Verified));
        }
    }

    #[test]
    fn test_tampered_signature_still_decodes() {
        let codec = Codec::default();
        let key = opaque("test-key");
        let envelope = codec.encode("Test data for signature verification", &key);
        let (_, payload) = envelope.as_str().split_once(SIGNATURE_SEPARATOR).unwrap();
        let tampered = Envelope::from(format!("{}{}{}", "0".repeat(64), SIGNATURE_SEPARATOR, payload));

        let decoded = codec.decode(&tampered, &key);
        assert_eq!(decoded.text(), Some("Test data for signature verification"));
        assert_eq!(decoded.integrity(), Some(Integrity::Mismatch));
    }

    #[test]
    fn test_wrong_key_still_decodes() {
        let codec = Codec::default();
        let envelope = codec.encode("payload", &opaque("key-for-encryption"));
        let decoded = codec.decode(&envelope, &opaque("different-key-for-decryption"));
        assert_eq!(decoded.text(), Some("payload"));
        assert_eq!(decoded.integrity(), Some(Integrity::Mismatch));
    }

    #[test]
    fn test_enforce_rejects_tampered_signature() {
        let codec = Codec::new(SignaturePolicy::Enforce);
        let envelope = codec.encode("payload", &opaque("key-a"));
        let decoded = codec.decode(&envelope, &opaque("key-b"));
        assert_eq!(decoded, Decoded::Failed(envelope.as_str().to_string()));

        // non-hex signature
        let (_, payload) = envelope.as_str().split_once(SIGNATURE_SEPARATOR).unwrap();
        let garbled = Envelope::from(format!("zz{}{}", SIGNATURE_SEPARATOR, payload));
        assert!(codec.decode(&garbled, &opaque("key-a")).is_failed());
    }

    #[test]
    fn test_enforce_rejects_stripped_signature() {
        let codec = Codec::new(SignaturePolicy::Enforce);
        let key = opaque("key-a");
        let forged = BASE64.encode("{\"title\":\"forged\"}");

        // signature dropped entirely
        let decoded = codec.decode(&Envelope::from(forged.as_str()), &key);
        assert_eq!(decoded, Decoded::Failed(forged.clone()));

        // advisory keeps the lenient behaviour but flags it
        let decoded = Codec::default().decode(&Envelope::from(forged.as_str()), &key);
        assert_eq!(decoded.text(), Some("{\"title\":\"forged\"}"));
        assert_eq!(decoded.integrity(), Some(Integrity::Unprotected));
    }

    #[test]
    fn test_derived_pair_verifies_across_halves() {
        let codec = Codec::new(SignaturePolicy::Enforce);
        let pair = KeyStrategy::DerivedHash.generate();
        let envelope = codec.encode("{\"message\":\"ok\"}", &pair.public());
        let decoded = codec.decode(&envelope, &pair.private());
        assert_eq!(decoded.text(), Some("{\"message\":\"ok\"}"));
        assert_eq!(decoded.integrity(), Some(Integrity::Verified));
    }

    #[test]
    fn test_no_separator_is_raw_base64() {
        let codec = Codec::default();
        let raw = Envelope::from(BASE64.encode("Test data without separator"));
        let decoded = codec.decode(&raw, &opaque("any-key"));
        assert_eq!(decoded.text(), Some("Test data without separator"));
        assert_eq!(decoded.integrity(), Some(Integrity::Unprotected));
    }

    #[test]
    fn test_too_many_separators() {
        let codec = Codec::default();
        let decoded = codec.decode(&Envelope::from("part1--part2--part3"), &opaque("any-key"));
        assert_eq!(decoded, Decoded::Failed("part1--part2--part3".to_string()));
    }

    #[test]
    fn test_malformed_input_returned_unchanged() {
        let codec = Codec::default();
        let input = "not-base64-with-no-separator";
        let decoded = codec.decode(&Envelope::from(input), &opaque("k"));
        assert_eq!(decoded, Decoded::Failed(input.to_string()));
        assert_eq!(decoded.into_text(), input);

        let decoded = codec.decode(&Envelope::from(input), &rsa_pair().private());
        assert_eq!(decoded.into_result(), Err(input.to_string()));
    }

    #[test]
    fn test_bad_payload_half_falls_through() {
        let codec = Codec::default();
        let decoded = codec.decode(&Envelope::from("abcd--***"), &opaque("k"));
        assert!(decoded.is_failed());
    }

    #[test]
    fn test_rsa_round_trip_same_key() {
        let codec = Codec::default();
        let private = rsa_pair().private();
        let envelope = codec.encode("{\"title\":\"Dune\"}", &private);
        assert!(!envelope.is_signed());
        let decoded = codec.decode(&envelope, &private);
        assert_eq!(decoded.text(), Some("{\"title\":\"Dune\"}"));
        assert_eq!(decoded.integrity(), Some(Integrity::Unsigned));
    }

    #[test]
    fn test_rsa_public_encrypt_private_decrypt() {
        let codec = Codec::default();
        let pair = rsa_pair();
        let envelope = codec.encode("secret book", &pair.public());
        assert_ne!(envelope.as_str(), BASE64.encode("secret book"));
        assert_eq!(codec.decode(&envelope, &pair.private()).text(), Some("secret book"));
    }

    #[test]
    fn test_rsa_oversized_payload_falls_back_to_base64() {
        let codec = Codec::default();
        let pair = rsa_pair();
        let long = "a".repeat(400);
        let envelope = codec.encode(&long, &pair.public());
        assert_eq!(envelope.as_str(), BASE64.encode(&long));

        let decoded = codec.decode(&envelope, &pair.private());
        assert_eq!(decoded.text(), Some(long.as_str()));
        assert_eq!(decoded.integrity(), Some(Integrity::Unprotected));

        // no signature to strip on this path, so enforce still accepts it
        let strict = Codec::new(SignaturePolicy::Enforce);
        assert_eq!(strict.decode(&envelope, &pair.private()).text(), Some(long.as_str()));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Enforce".parse::<SignaturePolicy>().unwrap(), SignaturePolicy::Enforce);
        assert_eq!("advisory".parse::<SignaturePolicy>().unwrap(), SignaturePolicy::Advisory);
        assert!("strict".parse::<SignaturePolicy>().is_err());
    }

    #[test]
    fn test_unparseable_pem_falls_back_to_base64() {
        let codec = Codec::default();
        let bogus = Key::classify("-----BEGIN PUBLIC KEY-----\nnope\n-----END PUBLIC KEY-----");
        assert_eq!(bogus.kind(), KeyKind::ServerPem);
        let envelope = codec.encode("hello", &bogus);
        assert_eq!(envelope.as_str(), BASE64.encode("hello"));
        assert!(matches!(codec.try_encode("hello", &bogus), Err(CodecError::Pem(_))));
    }
}
