//! Keyed lookup digests.
//!
//! A license row is indexed by `HMAC-SHA256(secret, normalize_key(key))`.
//! The secret is server-held configuration loaded once at startup; rotating
//! it orphans every key issued under the previous secret.

use crate::error::{CryptoError, CryptoResult};
use crate::key::normalize_key;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Size of a lookup digest in bytes.
pub const DIGEST_SIZE: usize = 32;

/// Shortest lookup secret accepted.
pub const MIN_SECRET_LEN: usize = 16;

/// HMAC output used to index a license by key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LookupDigest([u8; DIGEST_SIZE]);

impl LookupDigest {
    /// Wraps raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self(bytes)
    }

    /// Builds a digest from a slice, as read back from storage.
    ///
    /// Returns `None` when the slice is not exactly [`DIGEST_SIZE`] bytes.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; DIGEST_SIZE]>::try_from(bytes).ok().map(Self)
    }

    /// Returns the digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }
}

// Digests are index values only, but they still never show up in logs.
impl fmt::Debug for LookupDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LookupDigest([REDACTED])")
    }
}

/// Derives [`LookupDigest`]s under a fixed server secret.
#[derive(Clone)]
pub struct LookupIndexer {
    mac: HmacSha256,
}

impl LookupIndexer {
    /// Prepares an indexer for `secret`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidSecret`] if the secret is shorter than
    /// [`MIN_SECRET_LEN`] bytes.
    pub fn new(secret: &[u8]) -> CryptoResult<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(CryptoError::InvalidSecret {
                min: MIN_SECRET_LEN,
                actual: secret.len(),
            });
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| CryptoError::InvalidSecret {
            min: MIN_SECRET_LEN,
            actual: secret.len(),
        })?;
        Ok(Self { mac })
    }

    /// Digest of the normalized form of `key`.
    #[must_use]
    pub fn digest(&self, key: &str) -> LookupDigest {
        let normalized = Zeroizing::new(normalize_key(key));
        let mut mac = self.mac.clone();
        mac.update(normalized.as_bytes());
        LookupDigest(mac.finalize().into_bytes().into())
    }
}

impl fmt::Debug for LookupIndexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupIndexer")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
