//! Auth core configuration.
//!
//! Built once at process start and then shared read-only by the token manager
//! and the auth service.

use std::fmt;
use std::time::Duration;

use super::error::{AuthError, AuthResult};

/// Environment variable holding the HMAC signing secret.
pub const JWT_SECRET_ENV: &str = "AGROTRACK_JWT_SECRET";

/// Default session token lifetime (24 hours).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Minimum plaintext password length accepted at registration.
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 6;

/// Default token issuer claim.
pub const DEFAULT_ISSUER: &str = "agrotrack";

/// Immutable configuration for the auth core.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign and verify session tokens.
    jwt_secret: Vec<u8>,

    /// Lifetime of an issued token.
    pub token_ttl: Duration,

    /// Leeway in seconds applied to the expiry check.
    pub leeway_secs: u64,

    /// Issuer written into and required from tokens.
    pub issuer: String,

    /// Minimum password length at registration.
    pub min_password_len: usize,
}

impl AuthConfig {
    /// Create a configuration with the given signing secret.
    ///
    /// Fails when the secret is empty.
    pub fn new(secret: impl Into<Vec<u8>>) -> AuthResult<Self> {
        let jwt_secret = secret.into();
        if jwt_secret.is_empty() {
            return Err(AuthError::Config("JWT secret must not be empty".to_string()));
        }

        Ok(Self {
            jwt_secret,
            token_ttl: DEFAULT_TOKEN_TTL,
            leeway_secs: 0,
            issuer: DEFAULT_ISSUER.to_string(),
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
        })
    }

    /// Load the signing secret from `AGROTRACK_JWT_SECRET`.
    pub fn from_env() -> AuthResult<Self> {
        match std::env::var(JWT_SECRET_ENV) {
            Ok(secret) => Self::new(secret),
            Err(_) => Err(AuthError::Config(format!(
                "no JWT secret configured (set {})",
                JWT_SECRET_ENV
            ))),
        }
    }

    /// Set the token lifetime.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set the leeway for the expiry check.
    pub fn with_leeway(mut self, secs: u64) -> Self {
        self.leeway_secs = secs;
        self
    }

    /// Set the token issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Set the minimum password length.
    pub fn with_min_password_len(mut self, len: usize) -> Self {
        self.min_password_len = len;
        self
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.jwt_secret
    }
}

// The secret is never printed.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("leeway_secs", &self.leeway_secs)
            .field("issuer", &self.issuer)
            .field("min_password_len", &self.min_password_len)
            .finish()
    }
}
