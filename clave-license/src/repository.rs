//! Storage interface consumed by the engine.
//!
//! Implementations own persistence only. Quota enforcement lives in
//! [`crate::ActivationAdmission`], not in storage.

use crate::model::{ActivationId, License, LicenseId, NewLicense};
use async_trait::async_trait;
use clave_crypto::LookupDigest;
use thiserror::Error;

/// Errors reported by a repository implementation.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backend failed (I/O, connection, SQL).
    #[error("backend failure: {0}")]
    Backend(String),

    /// A uniqueness constraint rejected the write.
    #[error("conflicting record: {0}")]
    Conflict(String),

    /// A stored row could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// The referenced license does not exist.
    #[error("unknown license {0}")]
    UnknownLicense(LicenseId),
}

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// License and activation storage.
#[async_trait]
pub trait LicenseRepository: Send + Sync {
    /// Stores a new license and returns its id.
    async fn create_license(&self, license: NewLicense) -> RepositoryResult<LicenseId>;

    /// Finds a license by lookup digest.
    async fn license_by_digest(&self, digest: &LookupDigest) -> RepositoryResult<Option<License>>;

    /// Finds a license by id.
    async fn license_by_id(&self, id: LicenseId) -> RepositoryResult<Option<License>>;

    /// Number of committed activations for a license.
    async fn count_activations(&self, license_id: LicenseId) -> RepositoryResult<u32>;

    /// Records an activation and returns its id.
    async fn insert_activation(
        &self,
        license_id: LicenseId,
        device_id: &str,
    ) -> RepositoryResult<ActivationId>;
}
