//! Argon2id password hashing.
//!
//! Hashes are stored in PHC string format, so the algorithm parameters and
//! salt travel with the hash.

use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher as _, PasswordVerifier as _};
use rand::rngs::OsRng;
use rand::RngCore;

use super::error::{AuthError, AuthResult};

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// Well-formed hash with the default cost parameters that no password
/// matches. Verified against when the username is unknown so both login
/// failures cost one Argon2 run.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$M+h6Yxgf3qmHgt/910MkVw$6O3P1F+0Xtozg0jOaCubZilH8DmwSPd/MqVzGGvr57g";

/// Password hasher using Argon2id with the crate's default cost parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct PasswordHasher;

impl PasswordHasher {
    /// Create a hasher with default Argon2id parameters.
    pub fn new() -> Self {
        Self
    }

    /// Hash a plaintext password with a fresh random salt.
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let mut salt_bytes = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AuthError::Infrastructure(format!("salt encoding: {}", e)))?;

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Infrastructure(format!("password hashing: {}", e)))
    }

    /// Verify a plaintext password against a stored PHC hash.
    ///
    /// An unparseable hash never verifies.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is not valid PHC");
                false
            }
        }
    }

    /// Run a full verification against a hash nobody owns.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, DUMMY_HASH);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("secret1").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("secret1"));
        assert!(hasher.verify("secret1", &hash));
        assert!(!hasher.verify("secret2", &hash));
        assert!(!hasher.verify("", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = PasswordHasher::new();
        let a = hasher.hash("same-password").unwrap();
        let b = hasher.hash("same-password").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("same-password", &a));
        assert!(hasher.verify("same-password", &b));
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        let hasher = PasswordHasher::new();
        assert!(!hasher.verify("secret1", "not-a-phc-string"));
        assert!(!hasher.verify("secret1", ""));
    }

    #[test]
    fn test_dummy_hash_uses_default_cost() {
        let parsed = PasswordHash::new(DUMMY_HASH).unwrap();
        assert_eq!(parsed.algorithm, argon2::Algorithm::Argon2id.ident());

        let params = argon2::Params::try_from(&parsed).unwrap();
        let defaults = argon2::Params::default();
        assert_eq!(params.m_cost(), defaults.m_cost());
        assert_eq!(params.t_cost(), defaults.t_cost());
        assert_eq!(params.p_cost(), defaults.p_cost());

        let hasher = PasswordHasher::new();
        assert!(!hasher.verify("", DUMMY_HASH));
        assert!(!hasher.verify("secret1", DUMMY_HASH));
    }

    #[test]
    fn test_unicode_password() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("contraseña-ñandú").unwrap();
        assert!(hasher.verify("contraseña-ñandú", &hash));
        assert!(!hasher.verify("contrasena-nandu", &hash));
    }
}
