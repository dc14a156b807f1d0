//! Error handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use agrotrack_core::{AuditError, AuthError, StoreError};

/// Startup and wiring errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Credential store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Database open error.
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    /// Audit log error.
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// Auth core error.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Message returned to callers for every server-side fault.
const INTERNAL_MESSAGE: &str = "internal server error";

/// Request handling errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Error from the auth core.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// No bearer token on a protected route.
    #[error("missing bearer token")]
    MissingToken,

    /// Request could not be interpreted.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Server-side failure outside the auth core.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Auth(err) => match err {
                AuthError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                AuthError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT", err.to_string()),
                AuthError::Authentication => {
                    (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", err.to_string())
                }
                AuthError::InvalidToken => {
                    (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", err.to_string())
                }
                AuthError::ExpiredToken => {
                    (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED", err.to_string())
                }
                AuthError::MalformedToken => {
                    (StatusCode::UNAUTHORIZED, "MALFORMED_TOKEN", err.to_string())
                }
                AuthError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", err.to_string()),
                AuthError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
                AuthError::Config(_) | AuthError::Infrastructure(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    INTERNAL_MESSAGE.to_string(),
                ),
            },
            ApiError::MissingToken => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),
            ApiError::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", self.to_string())
            }
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                INTERNAL_MESSAGE.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Auth(AuthError::Validation("x".into())), StatusCode::BAD_REQUEST),
            (ApiError::Auth(AuthError::Conflict { field: "username" }), StatusCode::CONFLICT),
            (ApiError::Auth(AuthError::Authentication), StatusCode::UNAUTHORIZED),
            (ApiError::Auth(AuthError::ExpiredToken), StatusCode::UNAUTHORIZED),
            (ApiError::Auth(AuthError::Forbidden), StatusCode::FORBIDDEN),
            (ApiError::Auth(AuthError::NotFound), StatusCode::NOT_FOUND),
            (ApiError::MissingToken, StatusCode::UNAUTHORIZED),
            (
                ApiError::Auth(AuthError::Infrastructure("disk".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.parts().0, expected, "{:?}", err);
        }
    }

    #[test]
    fn test_fault_detail_is_hidden() {
        let err = ApiError::Auth(AuthError::Infrastructure("sled: corrupted page 17".into()));
        let (_, code, message) = err.parts();
        assert_eq!(code, "INTERNAL_ERROR");
        assert_eq!(message, INTERNAL_MESSAGE);
        assert!(!message.contains("sled"));
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = ApiError::Auth(AuthError::Validation("password must be at least 6 characters".into()));
        assert_eq!(err.parts().2, "password must be at least 6 characters");
    }
}
