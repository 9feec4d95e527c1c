//! Activation quota enforcement.
//!
//! Counting activations and inserting a new one is a check-then-act
//! sequence. Admissions for the same license are serialized behind a
//! per-license async lock so the count can never be stale when the insert
//! commits; admissions for different licenses never contend.
//!
//! The lock table is process-local. Every engine instance sharing one
//! database must go through a single process, or the repository must
//! provide equivalent serialization.

use crate::error::{LicenseError, LicenseResult};
use crate::model::{ActivationId, License, LicenseId};
use crate::repository::LicenseRepository;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Serializes quota checks per license.
#[derive(Debug, Default)]
pub struct ActivationAdmission {
    locks: Mutex<HashMap<LicenseId, Weak<AsyncMutex<()>>>>,
}

impl ActivationAdmission {
    /// Creates an admission controller with no licenses tracked.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits one more activation of `license` for `device_id`.
    ///
    /// Repeated activation of the same device is not deduplicated; every
    /// successful call consumes a slot.
    ///
    /// # Errors
    ///
    /// - [`LicenseError::QuotaExceeded`] when the license is at its limit
    /// - [`LicenseError::Cancelled`] when `cancel` fires before the insert
    /// - [`LicenseError::Storage`] on repository failure
    pub async fn admit(
        &self,
        repo: &dyn LicenseRepository,
        license: &License,
        device_id: &str,
        cancel: &CancellationToken,
    ) -> LicenseResult<ActivationId> {
        let lock = self.lock_for(license.id);
        let _guard = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(LicenseError::Cancelled),
            guard = lock.lock() => guard,
        };

        let count = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(LicenseError::Cancelled),
            count = repo.count_activations(license.id) => count?,
        };

        if count >= license.max_activations {
            debug!(
                license_id = %license.id,
                count,
                max = license.max_activations,
                "activation rejected: quota exhausted"
            );
            return Err(LicenseError::QuotaExceeded {
                max: license.max_activations,
            });
        }

        // Last point at which giving up leaves nothing behind.
        if cancel.is_cancelled() {
            return Err(LicenseError::Cancelled);
        }

        let activation_id = repo.insert_activation(license.id, device_id).await?;
        info!(
            license_id = %license.id,
            activation_id = %activation_id,
            slot = count + 1,
            max = license.max_activations,
            "activation admitted"
        );
        Ok(activation_id)
    }

    /// Number of licenses with an admission currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.values().filter(|lock| lock.strong_count() > 0).count()
    }

    fn lock_for(&self, id: LicenseId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(lock) = locks.get(&id).and_then(Weak::upgrade) {
            return lock;
        }

        locks.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(id, Arc::downgrade(&lock));
        lock
    }
}
