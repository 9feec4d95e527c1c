//! Error types for the storage layer.

use clave_license::{LicenseId, RepositoryError};
use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No license row with this id.
    #[error("unknown license {0}")]
    UnknownLicense(LicenseId),

    /// A row holds a value the engine cannot represent.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Another thread panicked while holding the connection.
    #[error("connection lock poisoned")]
    Poisoned,

    /// The blocking task running the query failed.
    #[error("storage task failed: {0}")]
    Task(String),
}

impl StoreError {
    fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Database(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        if err.is_constraint_violation() {
            return Self::Conflict(err.to_string());
        }
        match err {
            StoreError::UnknownLicense(id) => Self::UnknownLicense(id),
            StoreError::Serialization(_) | StoreError::InvalidData(_) => {
                Self::Corrupt(err.to_string())
            }
            _ => Self::Backend(err.to_string()),
        }
    }
}
