//! Error types for the crypto layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The OS random source could not produce bytes.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    /// Lookup secret is missing or too short.
    #[error("invalid lookup secret: expected at least {min} bytes, got {actual}")]
    InvalidSecret { min: usize, actual: usize },

    /// Argon2 parameters were rejected.
    #[error("invalid hash parameters: {0}")]
    InvalidParams(String),

    /// Stored hash record could not be parsed.
    #[error("malformed secret hash: {0}")]
    MalformedHash(String),

    /// Hashing failed for a reason other than a mismatch.
    #[error("secret hashing failed: {0}")]
    Hashing(String),
}
