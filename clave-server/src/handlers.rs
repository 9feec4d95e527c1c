//! Route handlers. Each one runs its engine call under a request deadline.

use crate::dto::{
    ActivateBody, ActivateResponse, CreateLicenseBody, CreateLicenseResponse, ValidateBody,
    ValidateResponse,
};
use crate::problem::Problem;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{OriginalUri, State};
use axum::Json;
use clave_license::{
    ActivationRequest, LicenseResult, NewLicenseRequest, ValidationRequest,
};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type ApiResult<T> = Result<Json<T>, Problem>;

pub(crate) async fn healthz() -> &'static str {
    "ok"
}

pub(crate) async fn create_license(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<CreateLicenseBody>, JsonRejection>,
) -> ApiResult<CreateLicenseResponse> {
    let Json(body) = body.map_err(|e| Problem::from_json_rejection(&e, uri.path()))?;
    let request = NewLicenseRequest {
        product_id: body.product_id,
        max_activations: body.max_activations,
        expires_at: body.expires_at,
        features: body.features,
    };

    let issued = with_deadline(state.request_timeout, |cancel| async move {
        state.service.create_license(request, &cancel).await
    })
    .await
    .map_err(|e| Problem::from_license_error(&e, uri.path()))?;

    Ok(Json(CreateLicenseResponse {
        license_id: issued.license_id.get(),
        license_key: issued.license_key,
    }))
}

pub(crate) async fn activate(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<ActivateBody>, JsonRejection>,
) -> ApiResult<ActivateResponse> {
    let Json(body) = body.map_err(|e| Problem::from_json_rejection(&e, uri.path()))?;
    let request = ActivationRequest {
        license_key: body.license_key,
        device_id: body.device_id,
        product_id: body.product_id,
    };

    let grant = with_deadline(state.request_timeout, |cancel| async move {
        state.service.activate(request, &cancel).await
    })
    .await
    .map_err(|e| Problem::from_license_error(&e, uri.path()))?;

    Ok(Json(ActivateResponse {
        activation_id: grant.activation_id.get(),
        token: grant.token,
    }))
}

pub(crate) async fn validate(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<ValidateBody>, JsonRejection>,
) -> ApiResult<ValidateResponse> {
    let Json(body) = body.map_err(|e| Problem::from_json_rejection(&e, uri.path()))?;
    let request = ValidationRequest {
        token: body.token,
        device_id: body.device_id,
    };

    let renewed = with_deadline(state.request_timeout, |cancel| async move {
        state.service.validate(request, &cancel).await
    })
    .await
    .map_err(|e| Problem::from_license_error(&e, uri.path()))?;

    Ok(Json(ValidateResponse {
        token: renewed.token,
    }))
}

/// Runs `op` with a cancellation token that fires after `timeout`.
///
/// The operation is never dropped mid-flight; it observes the token and
/// decides for itself where it can still stop cleanly.
async fn with_deadline<T, F, Fut>(timeout: Duration, op: F) -> LicenseResult<T>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = LicenseResult<T>>,
{
    let cancel = CancellationToken::new();
    let timer = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            cancel.cancel();
        })
    };

    let result = op(cancel).await;
    timer.abort();
    result
}
