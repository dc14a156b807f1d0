//! Authentication and authorization core.
//!
//! - **Registration**: validate, hash (Argon2id), insert with a default role
//! - **Login**: verify the stored hash, issue a signed session token
//! - **Permission check**: fresh role lookup against a set of accepted roles
//! - **Token validation**: signature, expiry and claim extraction
//!
//! # Permission outcomes
//!
//! ```text
//! Start -> LookupRole -> Found    -> role accepted?  -> Ok(true) | Ok(false)
//!                     -> NotFound -> Ok(false)
//!                     -> Fault    -> Err(AuthError::Infrastructure)
//! ```

mod account;
mod config;
mod error;
mod password;
mod service;
mod token;

pub use account::{NewAccount, Profile};
pub use config::{
    AuthConfig, DEFAULT_ISSUER, DEFAULT_MIN_PASSWORD_LEN, DEFAULT_TOKEN_TTL, JWT_SECRET_ENV,
};
pub use error::{AuthError, AuthResult, INVALID_CREDENTIALS};
pub use password::PasswordHasher;
pub use service::{AuthService, LoginOutcome};
pub use token::{strip_bearer, Claims, TokenManager};
