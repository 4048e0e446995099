use std::fmt;
use std::str::FromStr;

use rand::rngs::OsRng;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

use super::keys::{derive_public_hex, KeyKind, KeyPair};

/// Bytes of randomness behind a derived-hash private key
pub const DERIVED_PRIVATE_KEY_SIZE: usize = 32;
/// Modulus size for RSA key pairs
pub const RSA_KEY_BITS: usize = 2048;

#[derive(Debug, thiserror::Error)]
pub enum KeyGenerationError {
    #[error("randomness source unavailable: {0}")]
    Randomness(String),
    #[error("rsa key generation failed: {0}")]
    Rsa(#[from] rsa::Error),
    #[error("failed to encode key as PEM: {0}")]
    Pem(String),
}

/// How a fresh key pair is produced
///
/// - `DerivedHash`: the private key is 32 random bytes in hex and the public
///   key is `hex(SHA-256(private))`. Anyone holding the public key holds the
///   symmetric signing key too; this is a known weakness of the scheme.
/// - `Rsa`: an RSA-2048 pair, PKCS#8 private PEM and SPKI public PEM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    DerivedHash,
    #[default]
    Rsa,
}

impl KeyStrategy {
    /// Generate a fresh pair.
    ///
    /// # Panics
    ///
    /// Panics if the OS randomness source is unavailable. There is no way to
    /// continue without keys.
    pub fn generate(self) -> KeyPair {
        self.try_generate().expect("failed to generate key pair")
    }

    pub fn try_generate(self) -> Result<KeyPair, KeyGenerationError> {
        match self {
            KeyStrategy::DerivedHash => generate_derived_hash(),
            KeyStrategy::Rsa => generate_rsa(),
        }
    }

    /// The kind of key this strategy produces
    pub fn kind(self) -> KeyKind {
        match self {
            KeyStrategy::DerivedHash => KeyKind::OpaqueToken,
            KeyStrategy::Rsa => KeyKind::ServerPem,
        }
    }
}

impl fmt::Display for KeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStrategy::DerivedHash => write!(f, "derived-hash"),
            KeyStrategy::Rsa => write!(f, "rsa"),
        }
    }
}

impl FromStr for KeyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "derived-hash" | "derived_hash" | "derived" => Ok(KeyStrategy::DerivedHash),
            "rsa" => Ok(KeyStrategy::Rsa),
            other => Err(format!(
                "unknown key strategy '{}', expected 'derived-hash' or 'rsa'",
                other
            )),
        }
    }
}

fn generate_derived_hash() -> Result<KeyPair, KeyGenerationError> {
    let mut bytes = [0u8; DERIVED_PRIVATE_KEY_SIZE];
    getrandom::getrandom(&mut bytes).map_err(|e| KeyGenerationError::Randomness(e.to_string()))?;

    let private_key = hex::encode(bytes);
    let public_key = derive_public_hex(&private_key);

    Ok(KeyPair::new(KeyKind::OpaqueToken, public_key, private_key))
}

fn generate_rsa() -> Result<KeyPair, KeyGenerationError> {
    let private = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)?;
    let public = RsaPublicKey::from(&private);

    let private_pem = private
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| KeyGenerationError::Pem(e.to_string()))?;
    let public_pem = public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| KeyGenerationError::Pem(e.to_string()))?;

    Ok(KeyPair::new(
        KeyKind::ServerPem,
        public_pem,
        private_pem.as_str().to_owned(),
    ))
}
