use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;

/// Failure taxonomy for every auth-gated operation. Each failure is terminal
/// for the request.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Validation(&'static str),

    #[error("Invalid or expired token")]
    InvalidOrExpired,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("{0}")]
    Conflict(&'static str),

    #[error("{0}")]
    Gone(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Unauthorized | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::Validation(_) | AuthError::InvalidOrExpired => StatusCode::BAD_REQUEST,
            AuthError::UserAlreadyExists | AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::Gone(_) => StatusCode::GONE,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => AuthError::UserAlreadyExists,
            StoreError::MissingTenant => AuthError::Gone("Tenant no longer exists"),
            StoreError::Backend(e) => AuthError::Internal(e),
        }
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "rejected request body");
        AuthError::Validation("Invalid request body")
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AuthError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
