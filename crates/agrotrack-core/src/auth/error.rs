//! Auth core error types.

use thiserror::Error;

use crate::store::StoreError;

/// Message shared by every failed login, whatever the cause.
pub const INVALID_CREDENTIALS: &str = "invalid username or password";

/// Errors returned by the auth core.
///
/// A denied permission check is not an error: it is `Ok(false)`.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Input failed validation. The message is safe to show to the caller.
    #[error("validation error: {0}")]
    Validation(String),

    /// A unique field is already taken.
    #[error("{field} already exists")]
    Conflict {
        /// Name of the conflicting field.
        field: &'static str,
    },

    /// Login failed. Deliberately does not say which part was wrong.
    #[error("{}", INVALID_CREDENTIALS)]
    Authentication,

    /// Token signature or claims were rejected.
    #[error("invalid token")]
    InvalidToken,

    /// Token is past its expiry.
    #[error("token expired")]
    ExpiredToken,

    /// Token could not be parsed.
    #[error("malformed token")]
    MalformedToken,

    /// The acting principal lacks the required role.
    #[error("permission denied")]
    Forbidden,

    /// A principal targeted by an operation does not exist.
    #[error("principal not found")]
    NotFound,

    /// Invalid auth configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Store or hashing failure. Detail is for server-side logs only.
    #[error("infrastructure fault: {0}")]
    Infrastructure(String),
}

impl AuthError {
    /// Whether this error is a server-side fault rather than a
    /// caller-correctable condition.
    pub fn is_fault(&self) -> bool {
        matches!(self, AuthError::Infrastructure(_) | AuthError::Config(_))
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AuthError::NotFound,
            StoreError::UniqueViolation { field } => AuthError::Conflict { field },
            other => AuthError::Infrastructure(other.to_string()),
        }
    }
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
