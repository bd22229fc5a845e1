//! Rejection returned by the auth middleware and extractors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use keygate_auth_core::AuthError;
use serde::Serialize;

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// Authentication or authorization failure rendered as JSON.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct AuthRejection {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AuthRejection {
    /// No authenticated principal on the request.
    #[must_use]
    pub fn unauthenticated() -> Self {
        AuthError::Unauthenticated.into()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<AuthError> for AuthRejection {
    fn from(err: AuthError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Server-side details stay in the logs
        let message = if status.is_server_error() {
            tracing::error!(error = %err, "Authentication failed on the server side");
            match err {
                AuthError::StoreUnavailable(_) => "authentication temporarily unavailable".to_string(),
                AuthError::TransportUnsupported => err.to_string(),
                _ => "internal error".to_string(),
            }
        } else {
            err.to_string()
        };

        Self {
            status,
            code: err.error_code(),
            message,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}
