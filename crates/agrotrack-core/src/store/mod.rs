//! Credential store adapter.
//!
//! The auth core reads principals through the [`CredentialStore`] trait and
//! never touches storage directly. Uniqueness of `username` and `cedula` is
//! enforced by the store, so concurrent registrations race here and exactly
//! one wins.

mod config;
mod error;
mod sled_store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use sled_store::SledCredentialStore;

use serde::{Deserialize, Serialize};

use crate::role::Role;

/// A registered account as held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Numeric identifier assigned at insertion.
    pub id: u64,
    /// Unique, case-sensitive login name.
    pub username: String,
    /// Opaque PHC-format password hash.
    pub password_hash: String,
    /// Current role.
    pub role: Role,
    /// Display name.
    pub nombre: String,
    /// Surname.
    pub apellido: String,
    /// Unique national-ID-like string.
    pub cedula: String,
}

/// Fields needed to insert a new principal.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub nombre: String,
    pub apellido: String,
    pub cedula: String,
}

/// On-disk record layout. The role is kept as its raw tag so that unknown
/// tags are rejected when read rather than silently coerced.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredPrincipal {
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub nombre: String,
    pub apellido: String,
    pub cedula: String,
}

impl StoredPrincipal {
    pub(crate) fn from_new(principal: &NewPrincipal) -> Self {
        Self {
            username: principal.username.clone(),
            password_hash: principal.password_hash.clone(),
            role: principal.role.as_str().to_string(),
            nombre: principal.nombre.clone(),
            apellido: principal.apellido.clone(),
            cedula: principal.cedula.clone(),
        }
    }

    pub(crate) fn into_principal(self, id: u64) -> StoreResult<Principal> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        Ok(Principal {
            id,
            username: self.username,
            password_hash: self.password_hash,
            role,
            nombre: self.nombre,
            apellido: self.apellido,
            cedula: self.cedula,
        })
    }
}

/// Persistence collaborator for principals and their credentials.
///
/// Implementations must be safe to call concurrently from many threads.
pub trait CredentialStore: Send + Sync {
    /// Look up a principal by exact username.
    fn find_principal_by_username(&self, username: &str) -> StoreResult<Principal>;

    /// Look up a principal by numeric id.
    fn find_principal_by_id(&self, id: u64) -> StoreResult<Principal>;

    /// Look up only the current role of a principal.
    fn find_role_by_username(&self, username: &str) -> StoreResult<Role> {
        self.find_principal_by_username(username).map(|p| p.role)
    }

    /// Insert a new principal, returning its assigned id.
    ///
    /// Fails with [`StoreError::UniqueViolation`] when the username or cedula
    /// is already taken.
    fn insert_principal(&self, principal: NewPrincipal) -> StoreResult<u64>;

    /// Replace the role of an existing principal.
    fn update_role(&self, username: &str, role: Role) -> StoreResult<()>;

    /// All principals, ordered by id.
    fn list_principals(&self) -> StoreResult<Vec<Principal>>;
}
