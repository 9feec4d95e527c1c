//! Persisted license and activation records.

use chrono::{DateTime, Utc};
use clave_crypto::{LookupDigest, SecretHash};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix of the token subject claim, followed by the license id.
pub const SUBJECT_PREFIX: &str = "lic_";

/// Repository-assigned license identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseId(i64);

impl LicenseId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Token subject for this license: `lic_<id>`.
    #[must_use]
    pub fn subject(self) -> String {
        format!("{SUBJECT_PREFIX}{}", self.0)
    }

    /// Recovers a license id from a `lic_<id>` subject.
    ///
    /// Returns `None` for any other shape, including signs, whitespace and
    /// empty ids.
    #[must_use]
    pub fn from_subject(subject: &str) -> Option<Self> {
        let digits = subject.strip_prefix(SUBJECT_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(Self)
    }
}

impl fmt::Display for LicenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LicenseId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Repository-assigned activation identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivationId(i64);

impl ActivationId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ActivationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored license. Never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct License {
    pub id: LicenseId,
    pub product_id: i64,
    pub max_activations: u32,
    pub lookup_digest: LookupDigest,
    pub secret_hash: SecretHash,
    pub expires_at: Option<DateTime<Utc>>,
    /// Capabilities granted to every activation of this license.
    pub features: Vec<String>,
}

impl License {
    /// Whether the license has an expiry at or before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Fields supplied when a license is first stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLicense {
    pub product_id: i64,
    pub max_activations: u32,
    pub lookup_digest: LookupDigest,
    pub secret_hash: SecretHash,
    pub expires_at: Option<DateTime<Utc>>,
    pub features: Vec<String>,
}

/// One committed activation of a license on a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub id: ActivationId,
    pub license_id: LicenseId,
    pub device_id: String,
    pub created_at: DateTime<Utc>,
}
