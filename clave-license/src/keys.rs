//! Process-wide key material.
//!
//! Loaded once at startup and shared read-only by every request. Absent or
//! malformed material is a [`LicenseError::ServerMisconfigured`] error,
//! never a silent fallback.

use crate::error::{LicenseError, LicenseResult};
use crate::token::{PUBLIC_KEY_LEN, SIGNING_KEY_LEN};
use base64::{engine::general_purpose::STANDARD, Engine};
use clave_crypto::MIN_SECRET_LEN;
use ed25519_dalek::SigningKey;
use std::fmt;
use zeroize::Zeroizing;

/// HMAC lookup secret plus the Ed25519 token key pair.
#[derive(Clone)]
pub struct KeyMaterial {
    lookup_secret: Zeroizing<Vec<u8>>,
    signing_key: Zeroizing<[u8; SIGNING_KEY_LEN]>,
    public_key: [u8; PUBLIC_KEY_LEN],
}

impl KeyMaterial {
    /// Builds key material from raw bytes, deriving the public key from the
    /// signing seed.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::ServerMisconfigured`] if the lookup secret is
    /// too short.
    pub fn from_parts(
        lookup_secret: Vec<u8>,
        signing_key: [u8; SIGNING_KEY_LEN],
    ) -> LicenseResult<Self> {
        if lookup_secret.len() < MIN_SECRET_LEN {
            return Err(LicenseError::ServerMisconfigured(format!(
                "lookup secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        let public_key = SigningKey::from_bytes(&signing_key)
            .verifying_key()
            .to_bytes();
        Ok(Self {
            lookup_secret: Zeroizing::new(lookup_secret),
            signing_key: Zeroizing::new(signing_key),
            public_key,
        })
    }

    /// Decodes standard-base64 configuration values.
    ///
    /// When `public_key` is given it must match the key derived from
    /// `signing_key`.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::ServerMisconfigured`] naming the offending
    /// value. The values themselves are never included.
    pub fn from_base64(
        lookup_secret: &str,
        signing_key: &str,
        public_key: Option<&str>,
    ) -> LicenseResult<Self> {
        let secret = decode("lookup secret", lookup_secret)?;
        let seed = decode("signing key", signing_key)?;
        let seed: [u8; SIGNING_KEY_LEN] = seed.as_slice().try_into().map_err(|_| {
            LicenseError::ServerMisconfigured(format!(
                "signing key must decode to {SIGNING_KEY_LEN} bytes, got {}",
                seed.len()
            ))
        })?;

        let material = Self::from_parts(secret.to_vec(), seed)?;

        if let Some(encoded) = public_key {
            let public = decode("public key", encoded)?;
            if public.as_slice() != material.public_key {
                return Err(LicenseError::ServerMisconfigured(
                    "public key does not match signing key".to_string(),
                ));
            }
        }
        Ok(material)
    }

    /// HMAC secret for lookup digests.
    #[must_use]
    pub fn lookup_secret(&self) -> &[u8] {
        &self.lookup_secret
    }

    /// Ed25519 signing seed.
    #[must_use]
    pub fn signing_key(&self) -> &[u8; SIGNING_KEY_LEN] {
        &self.signing_key
    }

    /// Ed25519 public key matching the signing seed.
    #[must_use]
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public_key
    }

    /// Public key in standard base64, for publishing to token consumers.
    #[must_use]
    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(self.public_key)
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("lookup_secret", &"[REDACTED]")
            .field("signing_key", &"[REDACTED]")
            .field("public_key", &self.public_key_base64())
            .finish()
    }
}

fn decode(name: &str, value: &str) -> LicenseResult<Zeroizing<Vec<u8>>> {
    let value = value.trim();
    if value.is_empty() {
        return Err(LicenseError::ServerMisconfigured(format!("{name} is not set")));
    }
    STANDARD
        .decode(value)
        .map(Zeroizing::new)
        .map_err(|_| LicenseError::ServerMisconfigured(format!("{name} is not valid base64")))
}
