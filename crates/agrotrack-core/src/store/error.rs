//! Credential store error types.

use thiserror::Error;

/// Errors returned by a [`CredentialStore`](super::CredentialStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// No principal matched the lookup.
    #[error("principal not found")]
    NotFound,

    /// A unique field already holds the given value.
    #[error("{field} already exists")]
    UniqueViolation {
        /// Name of the unique field (`username` or `cedula`).
        field: &'static str,
    },

    /// A stored record could not be decoded, or holds an unknown role tag.
    #[error("invalid stored data: {0}")]
    InvalidData(String),

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::UniqueViolation { field: "cedula" };
        assert_eq!(err.to_string(), "cedula already exists");

        let err = StoreError::InvalidData("unknown role: root".into());
        assert!(err.to_string().contains("unknown role"));
    }
}
