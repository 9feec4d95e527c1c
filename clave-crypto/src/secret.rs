//! Argon2id secret hashing for license keys.
//!
//! Records are stored as PHC strings
//! (`$argon2id$v=19$m=19456,t=2,p=1$<salt>$<hash>`), so each record carries
//! the parameters and salt it was produced with. Verification always uses
//! the record's own parameters, which lets the defaults move without
//! invalidating existing licenses.

use crate::error::{CryptoError, CryptoResult};
use crate::key::normalize_key;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use std::fmt;
use zeroize::Zeroizing;

/// Size of the per-record salt in bytes.
pub const SALT_SIZE: usize = 16;

/// Argon2id cost parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretParams {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Time cost (iterations).
    pub time_cost: u32,
    /// Parallelism factor.
    pub parallelism: u32,
    /// Hash output length in bytes.
    pub output_len: usize,
}

impl Default for SecretParams {
    fn default() -> Self {
        // OWASP Argon2id baseline: 19 MiB, 2 passes, 1 lane.
        Self {
            memory_cost: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
            output_len: 32,
        }
    }
}

/// A PHC-encoded Argon2id record.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretHash(String);

impl SecretHash {
    /// Wraps a record read back from storage. Parsing is deferred to
    /// [`SecretVerifier::verify`].
    #[must_use]
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Returns the PHC string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretHash([REDACTED])")
    }
}

/// Hashes and verifies license keys.
#[derive(Clone, Debug)]
pub struct SecretVerifier {
    params: SecretParams,
}

impl Default for SecretVerifier {
    fn default() -> Self {
        Self {
            params: SecretParams::default(),
        }
    }
}

impl SecretVerifier {
    /// Creates a verifier that hashes with `params`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidParams`] if Argon2 rejects the parameters.
    pub fn new(params: SecretParams) -> CryptoResult<Self> {
        build_params(&params)?;
        Ok(Self { params })
    }

    /// Returns the parameters new hashes are produced with.
    #[must_use]
    pub fn params(&self) -> &SecretParams {
        &self.params
    }

    /// Hashes the normalized form of `key` under a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Entropy`] if no salt could be drawn, or
    /// [`CryptoError::Hashing`] if Argon2 fails.
    pub fn hash(&self, key: &str) -> CryptoResult<SecretHash> {
        let mut salt_bytes = [0u8; SALT_SIZE];
        rand::rngs::OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|e| CryptoError::Entropy(e.to_string()))?;
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| CryptoError::Hashing(e.to_string()))?;

        let normalized = Zeroizing::new(normalize_key(key));
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, build_params(&self.params)?);
        let hash = argon2
            .hash_password(normalized.as_bytes(), &salt)
            .map_err(|e| CryptoError::Hashing(e.to_string()))?;

        Ok(SecretHash(hash.to_string()))
    }

    /// Checks `key` against `record`.
    ///
    /// Returns `Ok(false)` on mismatch. The digest comparison is constant
    /// time.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MalformedHash`] if the record is not a valid
    /// Argon2id PHC string, or [`CryptoError::Hashing`] if recomputation fails.
    pub fn verify(&self, key: &str, record: &SecretHash) -> CryptoResult<bool> {
        let parsed =
            PasswordHash::new(record.as_str()).map_err(|e| CryptoError::MalformedHash(e.to_string()))?;

        match Algorithm::try_from(parsed.algorithm) {
            Ok(Algorithm::Argon2id) => {}
            _ => {
                return Err(CryptoError::MalformedHash(format!(
                    "unsupported algorithm {}",
                    parsed.algorithm
                )));
            }
        }

        let normalized = Zeroizing::new(normalize_key(key));
        match Argon2::default().verify_password(normalized.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(password_hash::Error::ParamNameInvalid)
            | Err(password_hash::Error::ParamValueInvalid(_))
            | Err(password_hash::Error::SaltInvalid(_))
            | Err(password_hash::Error::Version) => Err(CryptoError::MalformedHash(
                "record parameters rejected".to_string(),
            )),
            Err(e) => Err(CryptoError::Hashing(e.to_string())),
        }
    }
}

fn build_params(params: &SecretParams) -> CryptoResult<Params> {
    Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(params.output_len),
    )
    .map_err(|e| CryptoError::InvalidParams(e.to_string()))
}
