//! Registration input and the public profile projection.

use serde::{Deserialize, Serialize};

use super::error::{AuthError, AuthResult};
use crate::role::Role;
use crate::store::Principal;

/// A candidate account submitted for registration.
#[derive(Clone, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub nombre: String,
    pub apellido: String,
    pub cedula: String,
}

impl NewAccount {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        nombre: impl Into<String>,
        apellido: impl Into<String>,
        cedula: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            nombre: nombre.into(),
            apellido: apellido.into(),
            cedula: cedula.into(),
        }
    }

    /// Check that every field is present and the password is long enough.
    ///
    /// Length is counted in characters, not bytes.
    pub fn validate(&self, min_password_len: usize) -> AuthResult<()> {
        let fields = [
            ("username", &self.username),
            ("password", &self.password),
            ("nombre", &self.nombre),
            ("apellido", &self.apellido),
            ("cedula", &self.cedula),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(AuthError::Validation(format!("{} is required", name)));
            }
        }

        for (name, value) in [("username", &self.username), ("cedula", &self.cedula)] {
            if value.trim() != value.as_str() {
                return Err(AuthError::Validation(format!(
                    "{} must not start or end with whitespace",
                    name
                )));
            }
        }

        if self.password.chars().count() < min_password_len {
            return Err(AuthError::Validation(format!(
                "password must be at least {} characters",
                min_password_len
            )));
        }

        Ok(())
    }
}

// The plaintext password is never printed.
impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("nombre", &self.nombre)
            .field("apellido", &self.apellido)
            .field("cedula", &self.cedula)
            .finish()
    }
}

/// Public-safe view of a principal. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub username: String,
    pub nombre: String,
    pub apellido: String,
    pub cedula: String,
    pub role: Role,
}

impl From<&Principal> for Profile {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id,
            username: principal.username.clone(),
            nombre: principal.nombre.clone(),
            apellido: principal.apellido.clone(),
            cedula: principal.cedula.clone(),
            role: principal.role,
        }
    }
}

impl From<Principal> for Profile {
    fn from(principal: Principal) -> Self {
        Self {
            id: principal.id,
            username: principal.username,
            nombre: principal.nombre,
            apellido: principal.apellido,
            cedula: principal.cedula,
            role: principal.role,
        }
    }
}
