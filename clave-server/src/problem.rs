//! RFC 7807 problem documents.
//!
//! Every failure leaves the server as `application/problem+json`. Internal
//! failures carry a title only; their cause is logged, not returned.

use axum::extract::rejection::JsonRejection;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use clave_license::LicenseError;
use serde::{Deserialize, Serialize};

/// Media type of every error body.
pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// An RFC 7807 problem document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub instance: String,
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            kind: "about:blank".to_string(),
            title: title.into(),
            status: status.as_u16(),
            detail: None,
            instance: instance.into(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Maps an engine failure onto a status code and title.
    pub fn from_license_error(err: &LicenseError, instance: &str) -> Self {
        use LicenseError as E;

        match err {
            E::InvalidInput(msg) => {
                Self::new(StatusCode::BAD_REQUEST, "Invalid request", instance).with_detail(msg)
            }
            E::InvalidToken(reason) => {
                Self::new(StatusCode::UNAUTHORIZED, "Invalid token", instance).with_detail(reason)
            }
            E::Unverified => Self::new(StatusCode::UNAUTHORIZED, "Invalid license key", instance),
            E::NotFound => Self::new(StatusCode::NOT_FOUND, "License not found", instance),
            E::LicenseExpired => Self::new(StatusCode::FORBIDDEN, "License expired", instance),
            E::DeviceMismatch => Self::new(StatusCode::FORBIDDEN, "Device mismatch", instance),
            E::QuotaExceeded { max } => {
                Self::new(StatusCode::CONFLICT, "Activation limit reached", instance)
                    .with_detail(format!("license allows {max} activations"))
            }
            E::Cancelled => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "Request timed out", instance)
            }
            E::ServerMisconfigured(_)
            | E::InvalidSigningKey { .. }
            | E::InvalidTtl(_)
            | E::Storage(_)
            | E::Crypto(_)
            | E::Task(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", instance)
            }
        }
    }

    /// Maps a body that failed to parse as JSON.
    pub fn from_json_rejection(rejection: &JsonRejection, instance: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Malformed request body", instance)
            .with_detail(rejection.body_text())
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match serde_json::to_vec(&self) {
            Ok(body) => (status, [(header::CONTENT_TYPE, PROBLEM_CONTENT_TYPE)], body).into_response(),
            Err(_) => status.into_response(),
        }
    }
}
