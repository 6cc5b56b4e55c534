//! Maps domain errors to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use miniblog_auth::AuthError;
use miniblog_core::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Optional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error returned by handlers and middleware.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    /// HTTP status and default error code for the wrapped error's kind.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        let (status, default_code) = match self.0.kind {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "InvalidParameter"),
            ErrorKind::Authentication => (StatusCode::UNAUTHORIZED, "AuthFailure"),
            ErrorKind::Authorization => (StatusCode::FORBIDDEN, "AuthFailure.Unauthorized"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "ResourceNotFound"),
            ErrorKind::Conflict => (StatusCode::CONFLICT, "ResourceAlreadyExists"),
            ErrorKind::Internal
            | ErrorKind::Database
            | ErrorKind::Configuration
            | ErrorKind::Serialization => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };
        (status, self.0.code.unwrap_or(default_code))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            tracing::error!(kind = %self.0.kind, error = %self.0.message, "Internal server error");
            "Internal server error".to_string()
        } else {
            self.0.message
        };

        let body = ApiErrorResponse {
            error: code.to_string(),
            message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}
