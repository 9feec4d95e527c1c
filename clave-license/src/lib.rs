//! License activation and entitlement tokens for Clave.
//!
//! This crate handles:
//! - License creation with a one-time plaintext key
//! - Key verification against a stored Argon2id hash
//! - Activation quota enforcement, serialized per license
//! - Ed25519-signed entitlement tokens and their renewal
//!
//! # Flow
//!
//! 1. [`LicenseService::create_license`] returns `LIC-XXXX-...`. Only the
//!    HMAC lookup digest and the secret hash are persisted.
//! 2. [`LicenseService::activate`] finds the license by digest, verifies
//!    the key, takes an activation slot and returns a device-bound token.
//! 3. [`LicenseService::validate`] verifies a token against the live
//!    license row and returns a renewed one.
//!
//! Storage is abstract ([`LicenseRepository`]); [`MemoryRepository`] ships
//! here and a SQLite store lives in `clave-store`.

mod admission;
mod clock;
mod error;
mod keys;
mod memory;
mod model;
mod repository;
mod service;
mod token;

pub use admission::ActivationAdmission;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LicenseError, LicenseResult};
pub use keys::KeyMaterial;
pub use memory::MemoryRepository;
pub use model::{Activation, ActivationId, License, LicenseId, NewLicense, SUBJECT_PREFIX};
pub use repository::{LicenseRepository, RepositoryError, RepositoryResult};
pub use service::{
    renewal_ttl, ActivationGrant, ActivationRequest, EngineSettings, IssuedLicense,
    LicenseService, NewLicenseRequest, RenewedToken, ValidationRequest,
    DEFAULT_ACTIVATION_TTL_SECS, DEFAULT_RENEWAL_WINDOW_SECS, MAX_DEVICE_ID_LEN, MAX_FEATURE_LEN,
};
pub use token::{
    EntitlementClaims, TokenIssuer, TokenValidator, NOT_BEFORE_SKEW_SECS, PUBLIC_KEY_LEN,
    SIGNING_KEY_LEN, TOKEN_ALGORITHM,
};
