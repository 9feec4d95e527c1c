//! Shared helpers for HTTP tests.

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD, Engine};
use clave_crypto::SecretParams;
use clave_license::{EngineSettings, KeyMaterial, LicenseService, MemoryRepository};
use clave_server::{build_router, AppState};
use std::sync::Arc;
use std::time::Duration;

pub const LOOKUP_SECRET: &[u8] = b"server-tests-lookup-secret";

/// Deterministic Ed25519 seed: bytes 1..=32.
pub fn test_seed() -> [u8; 32] {
    let mut seed = [0u8; 32];
    for (i, b) in seed.iter_mut().enumerate() {
        *b = (i + 1) as u8;
    }
    seed
}

pub fn encoded_secret() -> String {
    STANDARD.encode(LOOKUP_SECRET)
}

pub fn encoded_seed() -> String {
    STANDARD.encode(test_seed())
}

pub fn test_service(repo: MemoryRepository) -> Arc<LicenseService> {
    let keys = KeyMaterial::from_parts(LOOKUP_SECRET.to_vec(), test_seed()).unwrap();
    let settings = EngineSettings {
        secret_params: SecretParams {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            output_len: 32,
        },
        ..EngineSettings::default()
    };
    Arc::new(LicenseService::new(Arc::new(repo), &keys, settings).unwrap())
}

/// Spin up the HTTP server on an OS-assigned port, returning the base URL.
pub async fn spawn_test_server() -> String {
    spawn_server_with(MemoryRepository::new(), Duration::from_secs(3)).await
}

pub async fn spawn_server_with(repo: MemoryRepository, timeout: Duration) -> String {
    let app = build_router(AppState::new(test_service(repo), timeout));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{port}")
}
