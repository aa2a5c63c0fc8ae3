//! `GET /v1/admin/registrants`: attendee and interest lists for the dashboard.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::{
    error::AdminAuthError, service::AdminAuthService, types::RegistrantsResponse,
    utils::extract_bearer_token,
};

#[utoipa::path(
    get,
    path = "/v1/admin/registrants",
    responses(
        (status = 200, description = "Registrants, newest first", body = RegistrantsResponse),
        (status = 401, description = "Missing, invalid or expired session token"),
        (status = 500, description = "Internal error")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn list_registrants(
    headers: HeaderMap,
    service: Extension<Arc<AdminAuthService>>,
) -> Response {
    let Some(token) = extract_bearer_token(&headers) else {
        return AdminAuthError::Auth("Session token required").into_response();
    };

    if let Err(err) = service.verify(Some(&token)).await {
        return err.into_response();
    }

    let store = service.store();
    let attendees = match store.list_attendees().await {
        Ok(rows) => rows,
        Err(err) => return AdminAuthError::Internal(err).into_response(),
    };
    let interests = match store.list_interests().await {
        Ok(rows) => rows,
        Err(err) => return AdminAuthError::Internal(err).into_response(),
    };

    (
        StatusCode::OK,
        Json(RegistrantsResponse {
            attendees,
            interests,
        }),
    )
        .into_response()
}
