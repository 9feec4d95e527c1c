//! HTTP API for the Clave license engine.
//!
//! Routes:
//! - `POST /api/v1/licenses`: create a license, returning its key once
//! - `POST /api/v1/activate`: exchange a key for a device-bound token
//! - `POST /api/v1/validate`: verify and renew a token
//! - `GET /healthz`: liveness
//!
//! Failures are RFC 7807 problem documents; see [`Problem`].

pub mod config;
pub mod dto;
mod handlers;
mod problem;

use axum::routing::{get, post};
use axum::Router;
use clave_license::LicenseService;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

pub use problem::{Problem, PROBLEM_CONTENT_TYPE};

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LicenseService>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(service: Arc<LicenseService>, request_timeout: Duration) -> Self {
        Self {
            service,
            request_timeout,
        }
    }
}

/// Build the HTTP API router with the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/licenses", post(handlers::create_license))
        .route("/api/v1/activate", post(handlers::activate))
        .route("/api/v1/validate", post(handlers::validate))
        .route("/healthz", get(handlers::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
