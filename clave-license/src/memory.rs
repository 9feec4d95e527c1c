//! In-process repository.
//!
//! Backs tests and embedded use. An optional per-call latency widens the
//! window between a count and the following insert, which is what the
//! admission race tests rely on.

use crate::model::{Activation, ActivationId, License, LicenseId, NewLicense};
use crate::repository::{LicenseRepository, RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clave_crypto::LookupDigest;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default)]
struct State {
    next_license_id: i64,
    next_activation_id: i64,
    licenses: HashMap<LicenseId, License>,
    by_digest: HashMap<LookupDigest, LicenseId>,
    activations: Vec<Activation>,
}

/// Repository kept entirely in memory.
#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
    latency: Option<Duration>,
}

impl MemoryRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty repository that sleeps for `latency` before every
    /// call, simulating a remote store.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: Mutex::default(),
            latency: Some(latency),
        }
    }

    /// Replaces a license's expiry. Administrative; the engine never calls it.
    pub fn set_license_expiry(
        &self,
        id: LicenseId,
        expires_at: Option<DateTime<Utc>>,
    ) -> RepositoryResult<()> {
        let mut state = self.lock()?;
        let license = state
            .licenses
            .get_mut(&id)
            .ok_or(RepositoryError::UnknownLicense(id))?;
        license.expires_at = expires_at;
        Ok(())
    }

    /// All activations recorded for a license, oldest first.
    pub fn activations(&self, license_id: LicenseId) -> RepositoryResult<Vec<Activation>> {
        let state = self.lock()?;
        Ok(state
            .activations
            .iter()
            .filter(|a| a.license_id == license_id)
            .cloned()
            .collect())
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Backend("memory repository lock poisoned".to_string()))
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl LicenseRepository for MemoryRepository {
    async fn create_license(&self, new: NewLicense) -> RepositoryResult<LicenseId> {
        self.delay().await;
        let mut state = self.lock()?;
        if state.by_digest.contains_key(&new.lookup_digest) {
            return Err(RepositoryError::Conflict("lookup digest already indexed".to_string()));
        }

        state.next_license_id += 1;
        let id = LicenseId::new(state.next_license_id);
        state.by_digest.insert(new.lookup_digest, id);
        state.licenses.insert(
            id,
            License {
                id,
                product_id: new.product_id,
                max_activations: new.max_activations,
                lookup_digest: new.lookup_digest,
                secret_hash: new.secret_hash,
                expires_at: new.expires_at,
                features: new.features,
            },
        );
        Ok(id)
    }

    async fn license_by_digest(&self, digest: &LookupDigest) -> RepositoryResult<Option<License>> {
        self.delay().await;
        let state = self.lock()?;
        Ok(state
            .by_digest
            .get(digest)
            .and_then(|id| state.licenses.get(id))
            .cloned())
    }

    async fn license_by_id(&self, id: LicenseId) -> RepositoryResult<Option<License>> {
        self.delay().await;
        Ok(self.lock()?.licenses.get(&id).cloned())
    }

    async fn count_activations(&self, license_id: LicenseId) -> RepositoryResult<u32> {
        self.delay().await;
        let count = self
            .lock()?
            .activations
            .iter()
            .filter(|a| a.license_id == license_id)
            .count();
        u32::try_from(count).map_err(|_| RepositoryError::Corrupt("activation count overflow".into()))
    }

    async fn insert_activation(
        &self,
        license_id: LicenseId,
        device_id: &str,
    ) -> RepositoryResult<ActivationId> {
        self.delay().await;
        let mut state = self.lock()?;
        if !state.licenses.contains_key(&license_id) {
            return Err(RepositoryError::UnknownLicense(license_id));
        }

        state.next_activation_id += 1;
        let id = ActivationId::new(state.next_activation_id);
        state.activations.push(Activation {
            id,
            license_id,
            device_id: device_id.to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }
}
