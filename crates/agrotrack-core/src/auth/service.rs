//! Registration, login and the permission predicate.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::account::{NewAccount, Profile};
use super::config::AuthConfig;
use super::error::{AuthError, AuthResult};
use super::password::PasswordHasher;
use super::token::{Claims, TokenManager};
use crate::role::Role;
use crate::store::{CredentialStore, NewPrincipal, Principal, StoreError};

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    /// Signed session token.
    pub token: String,
    /// Public profile of the authenticated principal.
    #[serde(rename = "user")]
    pub profile: Profile,
}

/// The auth core.
///
/// Holds no mutable state: the store owns the principals and the
/// configuration is fixed at construction, so one instance can be shared
/// across threads.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: TokenManager,
    min_password_len: usize,
}

impl AuthService {
    /// Create an auth service over a credential store.
    pub fn new(store: Arc<dyn CredentialStore>, config: AuthConfig) -> Self {
        let min_password_len = config.min_password_len;
        Self {
            store,
            hasher: PasswordHasher::new(),
            tokens: TokenManager::new(config),
            min_password_len,
        }
    }

    /// Self-registration. New accounts get [`Role::User`].
    pub fn register(&self, account: &NewAccount) -> AuthResult<u64> {
        self.create_account(account, Role::User)
    }

    /// Administrative "add user". New accounts get [`Role::Encargado`].
    pub fn provision(&self, account: &NewAccount) -> AuthResult<u64> {
        self.create_account(account, Role::Encargado)
    }

    /// Validate, hash and insert an account with an explicit role.
    pub fn create_account(&self, account: &NewAccount, role: Role) -> AuthResult<u64> {
        account.validate(self.min_password_len)?;

        let password_hash = self.hasher.hash(&account.password)?;
        let principal = NewPrincipal {
            username: account.username.clone(),
            password_hash,
            role,
            nombre: account.nombre.clone(),
            apellido: account.apellido.clone(),
            cedula: account.cedula.clone(),
        };

        match self.store.insert_principal(principal) {
            Ok(id) => {
                info!(id, username = %account.username, %role, "account created");
                Ok(id)
            }
            Err(StoreError::UniqueViolation { field }) => {
                debug!(username = %account.username, field, "registration conflict");
                Err(AuthError::Conflict { field })
            }
            Err(e) => Err(fault("insert principal", e)),
        }
    }

    /// Verify credentials and issue a session token.
    ///
    /// Unknown usernames and wrong passwords fail identically.
    pub fn login(&self, username: &str, password: &str) -> AuthResult<LoginOutcome> {
        let principal = match self.store.find_principal_by_username(username) {
            Ok(principal) => principal,
            Err(StoreError::NotFound) => {
                self.hasher.verify_dummy(password);
                debug!(%username, "login failed");
                return Err(AuthError::Authentication);
            }
            Err(e) => return Err(fault("find principal", e)),
        };

        if !self.hasher.verify(password, &principal.password_hash) {
            debug!(%username, "login failed");
            return Err(AuthError::Authentication);
        }

        let token = self.tokens.issue(principal.id, principal.role)?;
        info!(id = principal.id, %username, role = %principal.role, "login succeeded");

        Ok(LoginOutcome {
            token,
            profile: Profile::from(principal),
        })
    }

    /// Check whether `username` currently holds one of `accepted`.
    ///
    /// The role is read fresh from the store on every call. Returns
    /// `Ok(false)` both for unknown users and for a role mismatch; `Err` only
    /// when the lookup itself fails.
    pub fn check_permission(&self, username: &str, accepted: &[Role]) -> AuthResult<bool> {
        match self.store.find_role_by_username(username) {
            Ok(role) => Ok(role.is_any_of(accepted)),
            Err(StoreError::NotFound) => Ok(false),
            Err(e) => Err(fault("find role", e)),
        }
    }

    /// Like [`check_permission`](Self::check_permission) with raw role tags.
    ///
    /// Tags match case-insensitively. Unknown tags cannot match any stored
    /// role and are skipped.
    pub fn check_permission_tags(&self, username: &str, tags: &[&str]) -> AuthResult<bool> {
        let accepted: Vec<Role> = tags.iter().filter_map(|tag| tag.parse().ok()).collect();
        self.check_permission(username, &accepted)
    }

    /// Verify a session token and return its claims.
    pub fn verify_token(&self, token: &str) -> AuthResult<Claims> {
        self.tokens.verify(token)
    }

    /// Verify a token and resolve it to the current principal.
    ///
    /// A valid token whose principal no longer exists is rejected as invalid.
    pub fn authenticate_token(&self, token: &str) -> AuthResult<Principal> {
        let claims = self.tokens.verify(token)?;
        match self.store.find_principal_by_id(claims.user_id) {
            Ok(principal) => Ok(principal),
            Err(StoreError::NotFound) => {
                warn!(user_id = claims.user_id, "token subject no longer exists");
                Err(AuthError::InvalidToken)
            }
            Err(e) => Err(fault("find principal by id", e)),
        }
    }

    /// Change the role of `target`. Only an admin `actor` may do this.
    pub fn change_role(&self, actor: &str, target: &str, role: Role) -> AuthResult<()> {
        if !self.check_permission(actor, &[Role::Admin])? {
            return Err(AuthError::Forbidden);
        }

        match self.store.update_role(target, role) {
            Ok(()) => {
                info!(%actor, %target, %role, "role changed");
                Ok(())
            }
            Err(StoreError::NotFound) => Err(AuthError::NotFound),
            Err(e) => Err(fault("update role", e)),
        }
    }

    /// Public profile of a principal.
    pub fn profile(&self, username: &str) -> AuthResult<Profile> {
        match self.store.find_principal_by_username(username) {
            Ok(principal) => Ok(principal.into()),
            Err(StoreError::NotFound) => Err(AuthError::NotFound),
            Err(e) => Err(fault("find principal", e)),
        }
    }

    /// Public profiles of every principal, ordered by id.
    pub fn list_profiles(&self) -> AuthResult<Vec<Profile>> {
        self.store
            .list_principals()
            .map(|principals| principals.into_iter().map(Profile::from).collect())
            .map_err(|e| fault("list principals", e))
    }

    /// The token manager, for collaborators that only verify tokens.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }
}

/// Log a store failure with detail and convert it to an opaque fault.
fn fault(operation: &'static str, err: StoreError) -> AuthError {
    error!(operation, error = %err, "credential store fault");
    AuthError::Infrastructure(err.to_string())
}
