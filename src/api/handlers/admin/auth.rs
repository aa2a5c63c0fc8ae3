//! `POST /v1/admin/auth`: login, verify, logout and cleanup behind one action switch.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use super::{
    error::AdminAuthError,
    service::{AdminAuthService, RequestOrigin},
    types::{AdminAction, AdminAuthRequest, AdminAuthResponse},
    utils::{client_descriptor, extract_client_ip},
};

#[utoipa::path(
    post,
    path = "/v1/admin/auth",
    request_body = AdminAuthRequest,
    responses(
        (status = 200, description = "Action completed", body = AdminAuthResponse),
        (status = 400, description = "Missing required field or invalid action", body = AdminAuthResponse),
        (status = 401, description = "Invalid credentials or session", body = AdminAuthResponse),
        (status = 429, description = "Too many failed attempts from this address", body = AdminAuthResponse),
        (status = 500, description = "Internal error", body = AdminAuthResponse)
    ),
    tag = "admin"
)]
pub async fn admin_auth(
    headers: HeaderMap,
    service: Extension<Arc<AdminAuthService>>,
    payload: Option<Json<AdminAuthRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return AdminAuthError::Validation("Invalid request").into_response();
    };

    debug!(action = ?request.action, "Admin auth request");

    let result = match request.action {
        AdminAction::Login => {
            let origin = RequestOrigin {
                ip_address: extract_client_ip(&headers),
                user_agent: client_descriptor(request.user_agent, &headers),
            };
            service
                .login(&origin, request.secret.as_deref())
                .await
                .map(|issued| AdminAuthResponse {
                    expires_at: Some(issued.expires_at_rfc3339()),
                    session_token: Some(issued.token),
                    ..AdminAuthResponse::ok()
                })
        }
        AdminAction::Verify => service
            .verify(request.session_token.as_deref())
            .await
            .map(|owner| AdminAuthResponse {
                user_id: Some(owner),
                ..AdminAuthResponse::ok()
            }),
        AdminAction::Logout => service
            .logout(request.session_token.as_deref())
            .await
            .map(|()| AdminAuthResponse::ok()),
        AdminAction::Cleanup => service.cleanup().await.map(|removed| AdminAuthResponse {
            message: Some("Cleanup completed".to_string()),
            removed: Some(removed),
            ..AdminAuthResponse::ok()
        }),
    };

    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => err.into_response(),
    }
}
