//! Shared test helpers for license tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use clave_crypto::SecretParams;
use clave_license::{
    EngineSettings, KeyMaterial, LicenseService, ManualClock, MemoryRepository, NewLicenseRequest,
};
use ed25519_dalek::SigningKey;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Deterministic Ed25519 seed: bytes 1..=32.
pub fn test_seed() -> [u8; 32] {
    let mut seed = [0u8; 32];
    for (i, b) in seed.iter_mut().enumerate() {
        *b = (i + 1) as u8;
    }
    seed
}

/// Returns a deterministic Ed25519 key pair from a fixed seed.
pub fn test_keypair() -> (SigningKey, [u8; 32]) {
    let signing_key = SigningKey::from_bytes(&test_seed());
    let verifying_key = signing_key.verifying_key();
    (signing_key, verifying_key.to_bytes())
}

/// A second key pair, for "signed by someone else" cases.
pub fn other_keypair() -> (SigningKey, [u8; 32]) {
    let signing_key = SigningKey::from_bytes(&[7u8; 32]);
    let verifying_key = signing_key.verifying_key();
    (signing_key, verifying_key.to_bytes())
}

pub fn test_lookup_secret() -> Vec<u8> {
    b"lookup-secret-for-tests-only-0001".to_vec()
}

pub fn test_keys() -> KeyMaterial {
    KeyMaterial::from_parts(test_lookup_secret(), test_seed()).unwrap()
}

/// Cheap Argon2id cost so tests don't crawl.
pub fn fast_params() -> SecretParams {
    SecretParams {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
        output_len: 32,
    }
}

pub fn fast_settings() -> EngineSettings {
    EngineSettings {
        secret_params: fast_params(),
        ..EngineSettings::default()
    }
}

/// 2030-01-01T00:00:00Z.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
}

pub struct Harness {
    pub repo: Arc<MemoryRepository>,
    pub clock: Arc<ManualClock>,
    pub service: LicenseService,
}

pub fn harness() -> Harness {
    harness_with_repo(MemoryRepository::new())
}

pub fn harness_with_repo(repo: MemoryRepository) -> Harness {
    let repo = Arc::new(repo);
    let clock = Arc::new(ManualClock::new(epoch()));
    let service = LicenseService::new(repo.clone(), &test_keys(), fast_settings())
        .unwrap()
        .with_clock(clock.clone());
    Harness {
        repo,
        clock,
        service,
    }
}

pub fn license_request(max_activations: i64) -> NewLicenseRequest {
    NewLicenseRequest {
        product_id: 1,
        max_activations,
        expires_at: None,
        features: vec!["pro".to_string()],
    }
}

pub fn never() -> CancellationToken {
    CancellationToken::new()
}
