//! Role tags assigned to principals.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of roles a principal can hold.
///
/// Tags are parsed case-insensitively; the canonical form is lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full administrative access, including role changes.
    Admin,
    /// Project manager.
    Gerente,
    /// Field supervisor. Default for admin-provisioned accounts.
    Encargado,
    /// Lowest privilege. Default for self-registered accounts.
    User,
}

impl Role {
    /// All roles, in declaration order.
    pub const ALL: [Role; 4] = [Role::Admin, Role::Gerente, Role::Encargado, Role::User];

    /// Canonical lowercase tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Gerente => "gerente",
            Role::Encargado => "encargado",
            Role::User => "user",
        }
    }

    /// Check whether this role is one of `accepted`.
    pub fn is_any_of(&self, accepted: &[Role]) -> bool {
        accepted.contains(self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role tag is not one of the known roles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
