//! Cryptographic primitives for Clave license keys.
//!
//! Three independent pieces, each keyed off the normalized form of a key:
//! - [`generate_license_key`] / [`normalize_key`]: the key codec
//! - [`LookupIndexer`]: HMAC-SHA256 index used to find a license without
//!   storing the plaintext key
//! - [`SecretVerifier`]: Argon2id hash used to verify a presented key
//!
//! A license row stores both the digest and the hash, never the key.

mod error;
mod key;
mod lookup;
mod secret;

pub use error::{CryptoError, CryptoResult};
pub use key::{
    format_key, generate_license_key, normalize_key, KEY_ENTROPY_BYTES, KEY_GROUP_SIZE,
    KEY_PREFIX,
};
pub use lookup::{LookupDigest, LookupIndexer, DIGEST_SIZE, MIN_SECRET_LEN};
pub use secret::{SecretHash, SecretParams, SecretVerifier, SALT_SIZE};
