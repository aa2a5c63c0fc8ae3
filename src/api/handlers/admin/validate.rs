//! `POST /v1/admin/validate`: answer whether a secret is the admin secret.
//!
//! Goes through the same rate limiter and attempt log as login, so it cannot be used
//! to guess the secret faster than the login endpoint allows.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::error;

use super::{
    error::AdminAuthError,
    service::{AdminAuthService, RequestOrigin},
    types::{ValidateSecretRequest, ValidateSecretResponse},
    utils::{client_descriptor, extract_client_ip, non_empty},
};

fn invalid(status: StatusCode, message: &str) -> Response {
    let body = ValidateSecretResponse {
        valid: false,
        error: Some(message.to_string()),
    };
    (status, Json(body)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/admin/validate",
    request_body = ValidateSecretRequest,
    responses(
        (status = 200, description = "Secret checked", body = ValidateSecretResponse),
        (status = 400, description = "No secret provided", body = ValidateSecretResponse),
        (status = 429, description = "Too many failed attempts from this address", body = ValidateSecretResponse),
        (status = 500, description = "Internal error", body = ValidateSecretResponse)
    ),
    tag = "admin"
)]
pub async fn validate_admin(
    headers: HeaderMap,
    service: Extension<Arc<AdminAuthService>>,
    payload: Option<Json<ValidateSecretRequest>>,
) -> Response {
    let secret = payload.and_then(|Json(request)| request.secret);
    let Some(secret) = non_empty(secret.as_deref()) else {
        return invalid(StatusCode::BAD_REQUEST, "No secret provided");
    };

    let origin = RequestOrigin {
        ip_address: extract_client_ip(&headers),
        user_agent: client_descriptor(None, &headers),
    };

    match service.check_secret(&origin, secret).await {
        Ok(valid) => (StatusCode::OK, Json(ValidateSecretResponse { valid, error: None }))
            .into_response(),
        Err(AdminAuthError::RateLimited) => {
            invalid(StatusCode::TOO_MANY_REQUESTS, "Too many attempts")
        }
        Err(err) => {
            error!("Failed to validate admin secret: {err}");
            invalid(err.status(), err.public_message())
        }
    }
}
