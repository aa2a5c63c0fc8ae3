//! Error taxonomy for the admin endpoints and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use super::types::AdminAuthResponse;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
const RATE_LIMITED_MESSAGE: &str = "Too many failed attempts. Please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum AdminAuthError {
    /// A required field is missing or the request body is malformed.
    #[error("{0}")]
    Validation(&'static str),
    /// Bad secret, or an unknown, expired or revoked session.
    #[error("{0}")]
    Auth(&'static str),
    #[error("rate limited")]
    RateLimited,
    /// Store or configuration failure. Details stay in the logs.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AdminAuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to the caller.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Validation(message) | Self::Auth(message) => message,
            Self::RateLimited => RATE_LIMITED_MESSAGE,
            Self::Internal(_) => INTERNAL_ERROR_MESSAGE,
        }
    }
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            error!("Admin auth internal error: {err:#}");
        }
        let body = AdminAuthResponse::failure(self.public_message());
        (self.status(), Json(body)).into_response()
    }
}
