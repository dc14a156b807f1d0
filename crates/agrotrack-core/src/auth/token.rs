//! Session tokens (HS256 JWT).
//!
//! Tokens are issued at login and never stored server-side. They carry the
//! principal's numeric id and role and expire a fixed time after issuance.
//!
//! # Example Payload
//!
//! ```json
//! {
//!   "user_id": 12,
//!   "role": "encargado",
//!   "iat": 1735603200,
//!   "exp": 1735689600,
//!   "iss": "agrotrack"
//! }
//! ```

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::config::AuthConfig;
use super::error::{AuthError, AuthResult};
use crate::role::Role;

/// Session token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Numeric id of the principal.
    pub user_id: u64,

    /// Role at issuance. Authorization re-reads the stored role instead.
    pub role: Role,

    /// Issued at (Unix timestamp, seconds).
    pub iat: i64,

    /// Expiration time (Unix timestamp, seconds).
    pub exp: i64,

    /// Issuer.
    pub iss: String,
}

/// Issues and verifies session tokens with the configured secret.
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: AuthConfig,
}

impl TokenManager {
    /// Create a token manager from the auth configuration.
    pub fn new(config: AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_secs;
        validation.validate_exp = true;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.secret()),
            decoding_key: DecodingKey::from_secret(config.secret()),
            validation,
            config,
        }
    }

    /// Issue a token for a principal, expiring `token_ttl` from now.
    pub fn issue(&self, user_id: u64, role: Role) -> AuthResult<String> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.config.token_ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            user_id,
            role,
            iat: now,
            exp: now.saturating_add(ttl),
            iss: self.config.issuer.clone(),
        };
        self.sign(&claims)
    }

    /// Sign an arbitrary set of claims.
    pub fn sign(&self, claims: &Claims) -> AuthResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Infrastructure(format!("token signing: {}", e)))
    }

    /// Verify a token and extract its claims.
    ///
    /// Accepts an optional `Bearer ` prefix.
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let token = strip_bearer(token);

        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => AuthError::MalformedToken,
                _ => AuthError::InvalidToken,
            })
    }

    /// The configuration this manager was built from.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

/// Strip a `Bearer ` prefix if present.
pub fn strip_bearer(token: &str) -> &str {
    let token = token.trim();
    token
        .strip_prefix("Bearer ")
        .or_else(|| token.strip_prefix("bearer "))
        .unwrap_or(token)
        .trim()
}
