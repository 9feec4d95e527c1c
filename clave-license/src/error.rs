//! Error types for the licensing engine.

use crate::repository::RepositoryError;
use clave_crypto::CryptoError;
use thiserror::Error;

/// Licensing-specific errors.
///
/// Verification, quota and token failures are expected outcomes and carry
/// enough detail for a caller to act on. Storage and crypto failures are
/// internal; see [`LicenseError::is_internal`].
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Malformed request field.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No license for the presented key or id.
    #[error("license not found")]
    NotFound,

    /// Presented key does not match the stored secret hash.
    #[error("license key could not be verified")]
    Unverified,

    /// Activation limit reached.
    #[error("activation limit reached (max {max} activations)")]
    QuotaExceeded { max: u32 },

    /// Signature, structure or temporal failure on a token.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The license expiry is in the past.
    #[error("license expired")]
    LicenseExpired,

    /// Token is bound to a different device.
    #[error("device does not match token binding")]
    DeviceMismatch,

    /// Signing or verification keys are missing or malformed.
    #[error("server misconfigured: {0}")]
    ServerMisconfigured(String),

    /// Signing key has the wrong length.
    #[error("invalid signing key: expected {expected} bytes, got {actual}")]
    InvalidSigningKey { expected: usize, actual: usize },

    /// Token lifetime must be positive.
    #[error("invalid token ttl: {0}s")]
    InvalidTtl(i64),

    /// The caller's cancellation signal fired before the operation committed.
    #[error("operation cancelled")]
    Cancelled,

    /// Storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),

    /// Entropy or hashing failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// A blocking task panicked or was aborted.
    #[error("background task failed: {0}")]
    Task(String),
}

impl LicenseError {
    /// Returns true for failures that are the server's fault rather than
    /// the caller's: storage, entropy, hashing and key configuration.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Storage(_)
                | Self::Crypto(_)
                | Self::Task(_)
                | Self::ServerMisconfigured(_)
                | Self::InvalidSigningKey { .. }
                | Self::InvalidTtl(_)
        )
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
