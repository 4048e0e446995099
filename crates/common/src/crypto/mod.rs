//! Key material and the envelope codec
//!
//! - **Keys**: [`Key`] and [`KeyPair`] carry their [`KeyKind`], which picks
//!   the codec strategy. Bare strings arriving from outside are classified
//!   by looking for PEM delimiters.
//! - **Generation**: [`KeyStrategy`] produces either a derived-hash pair
//!   (opaque hex tokens, `public = hex(SHA-256(private))`) or an RSA-2048 pair.
//! - **Codec**: [`Codec`] turns text into an [`Envelope`] and back, never
//!   raising; decoding reports a [`Decoded`] outcome instead.
//!
//! # Security Model
//!
//! The derived-hash scheme is a signed Base64 envelope, not encryption. Its
//! signature is advisory by default ([`SignaturePolicy::Advisory`]). Only the
//! RSA strategy provides confidentiality.

mod codec;
mod generator;
mod keys;

pub use codec::{
    sign, Codec, CodecError, Decoded, Envelope, Integrity, SignaturePolicy, SIGNATURE_SEPARATOR,
};
pub use generator::{KeyGenerationError, KeyStrategy, DERIVED_PRIVATE_KEY_SIZE, RSA_KEY_BITS};
pub use keys::{prefix, Key, KeyError, KeyKind, KeyPair};
