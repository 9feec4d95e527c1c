mod common;

use clave_license::MemoryRepository;
use clave_server::dto::{
    ActivateBody, ActivateResponse, CreateLicenseBody, CreateLicenseResponse, ValidateBody,
    ValidateResponse,
};
use clave_server::{Problem, PROBLEM_CONTENT_TYPE};
use common::{spawn_server_with, spawn_test_server};
use pretty_assertions::assert_eq;
use std::time::Duration;

async fn post<B: serde::Serialize>(base: &str, path: &str, body: &B) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{base}{path}"))
        .json(body)
        .send()
        .await
        .unwrap()
}

async fn create(base: &str, max_activations: i64) -> CreateLicenseResponse {
    let resp = post(
        base,
        "/api/v1/licenses",
        &CreateLicenseBody {
            product_id: 1,
            max_activations,
            expires_at: None,
            features: vec!["pro".to_string()],
        },
    )
    .await;
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

async fn activate(base: &str, key: &str, device: &str) -> reqwest::Response {
    post(
        base,
        "/api/v1/activate",
        &ActivateBody {
            license_key: key.to_string(),
            device_id: device.to_string(),
            product_id: None,
        },
    )
    .await
}

async fn validate(base: &str, token: &str, device: &str) -> reqwest::Response {
    post(
        base,
        "/api/v1/validate",
        &ValidateBody {
            token: token.to_string(),
            device_id: device.to_string(),
        },
    )
    .await
}

async fn problem(resp: reqwest::Response, status: u16) -> Problem {
    assert_eq!(resp.status(), status);
    let content_type = resp
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(content_type, PROBLEM_CONTENT_TYPE);
    let problem: Problem = resp.json().await.unwrap();
    assert_eq!(problem.status, status);
    problem
}

// ── Happy path ───────────────────────────────────────────────────

#[tokio::test]
async fn healthz_returns_ok() {
    let base = spawn_test_server().await;
    let resp = reqwest::get(format!("{base}/healthz")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn create_activate_validate() {
    let base = spawn_test_server().await;

    let license = create(&base, 2).await;
    assert_eq!(license.license_id, 1);
    assert!(license.license_key.starts_with("LIC-"));

    let resp = activate(&base, &license.license_key, "laptop").await;
    assert_eq!(resp.status(), 200);
    let grant: ActivateResponse = resp.json().await.unwrap();
    assert_eq!(grant.activation_id, 1);
    assert_eq!(grant.token.split('.').count(), 3);

    let resp = validate(&base, &grant.token, "laptop").await;
    assert_eq!(resp.status(), 200);
    let renewed: ValidateResponse = resp.json().await.unwrap();
    assert_eq!(renewed.token.split('.').count(), 3);
}

#[tokio::test]
async fn response_fields_are_camel_case() {
    let base = spawn_test_server().await;
    let resp = post(
        &base,
        "/api/v1/licenses",
        &serde_json::json!({"productId": 4, "maxActivations": 1}),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body.get("licenseId").is_some());
    assert!(body.get("licenseKey").is_some());
}

// ── Problem documents ────────────────────────────────────────────

#[tokio::test]
async fn malformed_json_is_400() {
    let base = spawn_test_server().await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/v1/activate"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    let problem = problem(resp, 400).await;
    assert_eq!(problem.instance, "/api/v1/activate");
    assert_eq!(problem.kind, "about:blank");
}

#[tokio::test]
async fn missing_content_type_is_400() {
    let base = spawn_test_server().await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/v1/validate"))
        .body(r#"{"token":"x"}"#)
        .send()
        .await
        .unwrap();
    problem(resp, 400).await;
}

#[tokio::test]
async fn invalid_create_input_is_400() {
    let base = spawn_test_server().await;
    let resp = post(
        &base,
        "/api/v1/licenses",
        &CreateLicenseBody {
            product_id: 0,
            max_activations: 1,
            expires_at: None,
            features: Vec::new(),
        },
    )
    .await;
    let problem = problem(resp, 400).await;
    assert!(problem.detail.unwrap().contains("productId"));
}

#[tokio::test]
async fn unknown_key_is_404() {
    let base = spawn_test_server().await;
    create(&base, 1).await;
    let resp = activate(&base, "LIC-AAAA-BBBB-CCCC-DDDD-EEEE-FFFF-GGGG-HHHH", "d").await;
    let problem = problem(resp, 404).await;
    assert_eq!(problem.title, "License not found");
}

#[tokio::test]
async fn quota_exhaustion_is_409() {
    let base = spawn_test_server().await;
    let license = create(&base, 1).await;
    assert_eq!(activate(&base, &license.license_key, "a").await.status(), 200);

    let resp = activate(&base, &license.license_key, "b").await;
    problem(resp, 409).await;
}

#[tokio::test]
async fn bad_token_is_401() {
    let base = spawn_test_server().await;
    let resp = validate(&base, "e30.e30.AAAA", "").await;
    let problem = problem(resp, 401).await;
    assert_eq!(problem.title, "Invalid token");
    assert_eq!(problem.instance, "/api/v1/validate");
}

#[tokio::test]
async fn device_mismatch_is_403() {
    let base = spawn_test_server().await;
    let license = create(&base, 1).await;
    let grant: ActivateResponse = activate(&base, &license.license_key, "laptop")
        .await
        .json()
        .await
        .unwrap();

    let resp = validate(&base, &grant.token, "desktop").await;
    let problem = problem(resp, 403).await;
    assert_eq!(problem.title, "Device mismatch");
}

#[tokio::test]
async fn deadline_is_503() {
    let base = spawn_server_with(
        MemoryRepository::with_latency(Duration::from_millis(300)),
        Duration::from_millis(50),
    )
    .await;

    let resp = post(
        &base,
        "/api/v1/activate",
        &ActivateBody {
            license_key: "LIC-AAAA-BBBB".to_string(),
            device_id: "d".to_string(),
            product_id: None,
        },
    )
    .await;
    let problem = problem(resp, 503).await;
    assert_eq!(problem.title, "Request timed out");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let base = spawn_test_server().await;
    let resp = reqwest::get(format!("{base}/api/v1/nonexistent"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
