//! AgroTrack Core - credential verification and role-based authorization.
//!
//! This crate provides the auth core used by every privileged AgroTrack
//! endpoint:
//! - Argon2id password hashing and verification
//! - Signed, time-bounded session tokens (HS256 JWT)
//! - The role permission predicate
//! - A sled-backed credential store
//! - Structured audit events

pub mod audit;
pub mod auth;
pub mod role;
pub mod store;

pub use audit::{
    AuditError, AuditEvent, AuditEventKind, AuditLogger, MemoryAuditLogger, SledAuditLogger,
    TracingAuditLogger,
};
pub use auth::{
    strip_bearer, AuthConfig, AuthError, AuthResult, AuthService, Claims, LoginOutcome,
    NewAccount, PasswordHasher, Profile, TokenManager,
};
pub use role::{Role, UnknownRole};
pub use store::{
    CredentialStore, NewPrincipal, Principal, SledCredentialStore, StoreConfig, StoreError,
    StoreResult,
};
