//! The license lifecycle: create, activate, validate.
//!
//! [`LicenseService`] wires the key codec, lookup indexer, secret verifier,
//! admission controller and token issuer/validator together over a
//! [`LicenseRepository`]. It holds no mutable state besides the admission
//! lock table, so one instance is shared by every request.

use crate::admission::ActivationAdmission;
use crate::clock::{Clock, SystemClock};
use crate::error::{LicenseError, LicenseResult};
use crate::keys::KeyMaterial;
use crate::model::{ActivationId, License, LicenseId, NewLicense};
use crate::repository::{LicenseRepository, RepositoryResult};
use crate::token::{EntitlementClaims, TokenIssuer, TokenValidator};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use clave_crypto::{
    generate_license_key, normalize_key, CryptoResult, LookupIndexer, SecretParams,
    SecretVerifier,
};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Default lifetime of a token issued at activation (7 days).
pub const DEFAULT_ACTIVATION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Longest lifetime a single renewal grants (7 days).
pub const DEFAULT_RENEWAL_WINDOW_SECS: i64 = 7 * 24 * 60 * 60;

/// Longest accepted device identifier, in bytes.
pub const MAX_DEVICE_ID_LEN: usize = 256;

/// Longest accepted feature name, in bytes.
pub const MAX_FEATURE_LEN: usize = 64;

/// Tunables for a [`LicenseService`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// `aud` claim written into and required of every token.
    pub audience: String,
    /// Lifetime of tokens issued by [`LicenseService::activate`].
    pub activation_ttl: Duration,
    /// Upper bound on the lifetime granted by one renewal.
    pub renewal_window: Duration,
    /// Argon2id cost for newly created licenses.
    pub secret_params: SecretParams,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            audience: "clave".to_string(),
            activation_ttl: Duration::seconds(DEFAULT_ACTIVATION_TTL_SECS),
            renewal_window: Duration::seconds(DEFAULT_RENEWAL_WINDOW_SECS),
            secret_params: SecretParams::default(),
        }
    }
}

/// Input to [`LicenseService::create_license`].
#[derive(Debug, Clone, Default)]
pub struct NewLicenseRequest {
    pub product_id: i64,
    pub max_activations: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub features: Vec<String>,
}

/// A freshly created license. The key is shown exactly once.
#[derive(Debug, Clone)]
pub struct IssuedLicense {
    pub license_id: LicenseId,
    pub license_key: String,
}

/// Input to [`LicenseService::activate`].
#[derive(Debug, Clone, Default)]
pub struct ActivationRequest {
    pub license_key: String,
    pub device_id: String,
    /// When set, the license must belong to this product.
    pub product_id: Option<i64>,
}

/// Result of a successful activation.
#[derive(Debug, Clone)]
pub struct ActivationGrant {
    pub activation_id: ActivationId,
    pub token: String,
    pub claims: EntitlementClaims,
}

/// Input to [`LicenseService::validate`].
#[derive(Debug, Clone, Default)]
pub struct ValidationRequest {
    pub token: String,
    /// Empty skips the device binding check.
    pub device_id: String,
}

/// Result of a successful validation.
#[derive(Debug, Clone)]
pub struct RenewedToken {
    pub token: String,
    pub claims: EntitlementClaims,
}

/// License lifecycle engine.
pub struct LicenseService {
    repo: Arc<dyn LicenseRepository>,
    indexer: LookupIndexer,
    verifier: SecretVerifier,
    admission: ActivationAdmission,
    issuer: TokenIssuer,
    validator: TokenValidator,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl LicenseService {
    /// Builds a service over `repo` with the given keys and settings.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::ServerMisconfigured`] for unusable keys or
    /// non-positive token lifetimes, and [`LicenseError::Crypto`] for
    /// rejected Argon2 parameters.
    pub fn new(
        repo: Arc<dyn LicenseRepository>,
        keys: &KeyMaterial,
        settings: EngineSettings,
    ) -> LicenseResult<Self> {
        if settings.activation_ttl <= Duration::zero() {
            return Err(LicenseError::ServerMisconfigured(
                "activation ttl must be positive".to_string(),
            ));
        }
        if settings.renewal_window <= Duration::zero() {
            return Err(LicenseError::ServerMisconfigured(
                "renewal window must be positive".to_string(),
            ));
        }

        let indexer = LookupIndexer::new(keys.lookup_secret())
            .map_err(|e| LicenseError::ServerMisconfigured(e.to_string()))?;
        let verifier = SecretVerifier::new(settings.secret_params.clone())?;
        let issuer = TokenIssuer::new(keys.signing_key(), settings.audience.clone())?;
        let validator = TokenValidator::new(keys.public_key(), settings.audience.clone())?;

        Ok(Self {
            repo,
            indexer,
            verifier,
            admission: ActivationAdmission::new(),
            issuer,
            validator,
            clock: Arc::new(SystemClock),
            settings,
        })
    }

    /// Replaces the clock used for issuance and expiry checks.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The settings this service runs with.
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Token verifier sharing this service's public key and audience.
    #[must_use]
    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// Admission controller, exposed for in-flight inspection.
    #[must_use]
    pub fn admission(&self) -> &ActivationAdmission {
        &self.admission
    }

    /// Creates a license and returns its plaintext key.
    ///
    /// Only the lookup digest and the Argon2id hash of the key are stored.
    pub async fn create_license(
        &self,
        request: NewLicenseRequest,
        cancel: &CancellationToken,
    ) -> LicenseResult<IssuedLicense> {
        self.create_inner(request, cancel)
            .await
            .inspect_err(|e| log_failure("create_license", e))
    }

    async fn create_inner(
        &self,
        mut request: NewLicenseRequest,
        cancel: &CancellationToken,
    ) -> LicenseResult<IssuedLicense> {
        // Expiries are kept at whole-second precision, like token claims.
        request.expires_at = request.expires_at.map(|exp| exp.trunc_subsecs(0));
        let max_activations = check_new_license(&request, self.clock.now())?;

        let license_key = generate_license_key()?;
        let verifier = self.verifier.clone();
        let key = license_key.clone();
        let secret_hash = run_blocking(cancel, move || verifier.hash(&key)).await?;
        let lookup_digest = self.indexer.digest(&license_key);

        if cancel.is_cancelled() {
            return Err(LicenseError::Cancelled);
        }
        let license_id = self
            .repo
            .create_license(NewLicense {
                product_id: request.product_id,
                max_activations,
                lookup_digest,
                secret_hash,
                expires_at: request.expires_at,
                features: request.features,
            })
            .await?;

        info!(
            license_id = %license_id,
            product_id = request.product_id,
            max_activations,
            "license created"
        );
        Ok(IssuedLicense {
            license_id,
            license_key,
        })
    }

    /// Exchanges a license key for an activation slot and a signed token.
    pub async fn activate(
        &self,
        request: ActivationRequest,
        cancel: &CancellationToken,
    ) -> LicenseResult<ActivationGrant> {
        self.activate_inner(request, cancel)
            .await
            .inspect_err(|e| log_failure("activate", e))
    }

    async fn activate_inner(
        &self,
        request: ActivationRequest,
        cancel: &CancellationToken,
    ) -> LicenseResult<ActivationGrant> {
        if normalize_key(&request.license_key).is_empty() {
            return Err(LicenseError::InvalidInput("licenseKey is required".to_string()));
        }
        check_device_id(&request.device_id)?;

        let digest = self.indexer.digest(&request.license_key);
        let license = guarded(cancel, self.repo.license_by_digest(&digest))
            .await?
            .ok_or(LicenseError::NotFound)?;

        if let Some(product_id) = request.product_id
            && product_id != license.product_id
        {
            debug!(license_id = %license.id, product_id, "activation for a different product");
            return Err(LicenseError::NotFound);
        }

        let verifier = self.verifier.clone();
        let key = request.license_key.clone();
        let record = license.secret_hash.clone();
        if !run_blocking(cancel, move || verifier.verify(&key, &record)).await? {
            info!(license_id = %license.id, "activation rejected: key not verified");
            return Err(LicenseError::Unverified);
        }

        let now = self.clock.now();
        if license.is_expired_at(now) {
            return Err(LicenseError::LicenseExpired);
        }

        // Sign before taking a slot so a committed activation always has a token.
        let (token, claims) = self.issuer.issue(
            &license,
            &license.features,
            Some(request.device_id.as_str()),
            self.settings.activation_ttl,
            now,
        )?;
        let activation_id = self
            .admission
            .admit(self.repo.as_ref(), &license, &request.device_id, cancel)
            .await?;

        Ok(ActivationGrant {
            activation_id,
            token,
            claims,
        })
    }

    /// Verifies a token against the live license and issues a renewal.
    pub async fn validate(
        &self,
        request: ValidationRequest,
        cancel: &CancellationToken,
    ) -> LicenseResult<RenewedToken> {
        self.validate_inner(request, cancel)
            .await
            .inspect_err(|e| log_failure("validate", e))
    }

    async fn validate_inner(
        &self,
        request: ValidationRequest,
        cancel: &CancellationToken,
    ) -> LicenseResult<RenewedToken> {
        let now = self.clock.now();

        let claims = self.validator.decode(&request.token, now)?;
        let license_id = claims
            .license_id()
            .ok_or_else(|| LicenseError::InvalidToken("malformed subject".to_string()))?;

        let license = guarded(cancel, self.repo.license_by_id(license_id))
            .await?
            .ok_or(LicenseError::NotFound)?;

        // The live row decides, not the expiry embedded at issuance.
        if license.is_expired_at(now) {
            return Err(LicenseError::LicenseExpired);
        }

        if let Some(bound) = claims.bound_device()
            && !request.device_id.is_empty()
            && request.device_id != bound
        {
            info!(license_id = %license.id, "validation rejected: device mismatch");
            return Err(LicenseError::DeviceMismatch);
        }

        let ttl = renewal_ttl(&license, now, self.settings.renewal_window);
        let (token, renewed) = self.issuer.issue(
            &license,
            &claims.features,
            claims.bound_device(),
            ttl,
            now,
        )?;

        debug!(license_id = %license.id, exp = renewed.exp, "token renewed");
        Ok(RenewedToken {
            token,
            claims: renewed,
        })
    }
}

/// Lifetime of a renewed token: the renewal window, cut short by the
/// license expiry.
#[must_use]
pub fn renewal_ttl(license: &License, now: DateTime<Utc>, window: Duration) -> Duration {
    match license.expires_at {
        Some(expires_at) => window.min(expires_at - now),
        None => window,
    }
}

fn check_new_license(request: &NewLicenseRequest, now: DateTime<Utc>) -> LicenseResult<u32> {
    if request.product_id <= 0 {
        return Err(LicenseError::InvalidInput("productId must be positive".to_string()));
    }
    let max_activations = u32::try_from(request.max_activations).map_err(|_| {
        LicenseError::InvalidInput("maxActivations must be between 0 and 2^32-1".to_string())
    })?;
    if request.expires_at.is_some_and(|exp| exp <= now) {
        return Err(LicenseError::InvalidInput("expiresAt must be in the future".to_string()));
    }
    for feature in &request.features {
        if feature.trim().is_empty() || feature.len() > MAX_FEATURE_LEN {
            return Err(LicenseError::InvalidInput(format!(
                "features must be non-empty and at most {MAX_FEATURE_LEN} bytes"
            )));
        }
    }
    Ok(max_activations)
}

fn check_device_id(device_id: &str) -> LicenseResult<()> {
    if device_id.len() > MAX_DEVICE_ID_LEN {
        return Err(LicenseError::InvalidInput(format!(
            "deviceId must be at most {MAX_DEVICE_ID_LEN} bytes"
        )));
    }
    Ok(())
}

/// Awaits a repository read unless `cancel` fires first.
async fn guarded<T>(
    cancel: &CancellationToken,
    read: impl Future<Output = RepositoryResult<T>>,
) -> LicenseResult<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(LicenseError::Cancelled),
        result = read => result.map_err(Into::into),
    }
}

/// Runs CPU-heavy crypto on the blocking pool.
async fn run_blocking<T, F>(cancel: &CancellationToken, work: F) -> LicenseResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> CryptoResult<T> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(LicenseError::Cancelled),
        joined = task => joined
            .map_err(|e| LicenseError::Task(e.to_string()))?
            .map_err(Into::into),
    }
}

fn log_failure(operation: &str, err: &LicenseError) {
    if err.is_internal() {
        error!(operation, error = %err, "license operation failed");
    } else {
        debug!(operation, error = %err, "license operation refused");
    }
}
