//! Integration tests for registration, login and the permission predicate.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use agrotrack_core::{
    AuthConfig, AuthError, AuthService, CredentialStore, NewAccount, NewPrincipal, Principal,
    Role, SledCredentialStore, StoreConfig, StoreError, StoreResult,
};

struct TestContext {
    auth: Arc<AuthService>,
    store: Arc<SledCredentialStore>,
}

impl TestContext {
    fn new() -> Self {
        let store = Arc::new(SledCredentialStore::open(&StoreConfig::temporary()).unwrap());
        let config = AuthConfig::new("integration-test-secret").unwrap();
        let auth = Arc::new(AuthService::new(store.clone(), config));
        Self { auth, store }
    }
}

fn ana() -> NewAccount {
    NewAccount::new("ana", "secret1", "Ana", "Lopez", "111")
}

#[test]
fn scenario_a_register_then_login() {
    let ctx = TestContext::new();

    let id = ctx.auth.register(&ana()).unwrap();
    assert!(id >= 1);

    let outcome = ctx.auth.login("ana", "secret1").unwrap();
    assert!(!outcome.token.is_empty());
    assert_eq!(outcome.profile.role, Role::User);
    assert_eq!(outcome.profile.id, id);
    assert_eq!(outcome.profile.nombre, "Ana");
    assert_eq!(outcome.profile.apellido, "Lopez");
    assert_eq!(outcome.profile.cedula, "111");

    let claims = ctx.auth.verify_token(&outcome.token).unwrap();
    assert_eq!(claims.role, Role::User);
    assert_eq!(claims.user_id, id);
}

#[test]
fn scenario_b_wrong_password() {
    let ctx = TestContext::new();
    ctx.auth.register(&ana()).unwrap();

    let err = ctx.auth.login("ana", "wrongpass").unwrap_err();
    assert!(matches!(err, AuthError::Authentication));
}

#[test]
fn scenario_c_user_lacks_elevated_roles() {
    let ctx = TestContext::new();
    ctx.auth.register(&ana()).unwrap();

    let granted = ctx
        .auth
        .check_permission("ana", &[Role::Admin, Role::Gerente])
        .unwrap();
    assert!(!granted);
}

#[test]
fn scenario_d_unknown_user_is_denied_not_error() {
    let ctx = TestContext::new();
    let granted = ctx.auth.check_permission("ghost_user", &[Role::Admin]).unwrap();
    assert!(!granted);
}

#[test]
fn scenario_e_short_password_creates_nothing() {
    let ctx = TestContext::new();
    let mut account = ana();
    account.password = "abc".to_string();

    let err = ctx.auth.register(&account).unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
    assert!(ctx.store.is_empty());
    assert!(matches!(
        ctx.store.find_principal_by_username("ana"),
        Err(StoreError::NotFound)
    ));
}

#[test]
fn unknown_user_and_wrong_password_look_the_same() {
    let ctx = TestContext::new();
    ctx.auth.register(&ana()).unwrap();

    let wrong_password = ctx.auth.login("ana", "not-it").unwrap_err();
    let unknown_user = ctx.auth.login("ghost_user", "not-it").unwrap_err();
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    assert!(matches!(wrong_password, AuthError::Authentication));
    assert!(matches!(unknown_user, AuthError::Authentication));

    // Same for the permission predicate: a wrong role and an unknown user.
    assert_eq!(
        ctx.auth.check_permission("ana", &[Role::Admin]).unwrap(),
        ctx.auth.check_permission("ghost_user", &[Role::Admin]).unwrap()
    );
}

#[test]
fn unknown_user_costs_a_password_check() {
    let ctx = TestContext::new();
    ctx.auth.register(&ana()).unwrap();

    let timed = |username: &str| -> Duration {
        let start = Instant::now();
        for _ in 0..3 {
            assert!(matches!(
                ctx.auth.login(username, "wrongpass"),
                Err(AuthError::Authentication)
            ));
        }
        start.elapsed()
    };

    let wrong_password = timed("ana");
    let unknown_user = timed("ghost_user");
    assert!(
        unknown_user * 4 >= wrong_password,
        "unknown user {:?} vs wrong password {:?}",
        unknown_user,
        wrong_password
    );
}

#[test]
fn padded_username_is_rejected() {
    let ctx = TestContext::new();
    ctx.auth.register(&ana()).unwrap();

    let mut padded = ana();
    padded.username = "ana ".to_string();
    padded.cedula = "222".to_string();
    assert!(matches!(ctx.auth.register(&padded), Err(AuthError::Validation(_))));
    assert_eq!(ctx.store.len(), 1);
}

#[test]
fn permission_check_is_idempotent() {
    let ctx = TestContext::new();
    ctx.auth.register(&ana()).unwrap();

    for accepted in [&[Role::User][..], &[Role::Admin][..], &[][..]] {
        let first = ctx.auth.check_permission("ana", accepted).unwrap();
        let second = ctx.auth.check_permission("ana", accepted).unwrap();
        assert_eq!(first, second);
    }
    assert!(ctx.auth.check_permission("ana", &[Role::User]).unwrap());
}

#[test]
fn password_single_character_mutations_never_verify() {
    let ctx = TestContext::new();
    let password = "secret1";
    ctx.auth.register(&ana()).unwrap();
    assert!(ctx.auth.login("ana", password).is_ok());

    let chars: Vec<char> = password.chars().collect();
    let mut mutations = Vec::new();
    for i in 0..chars.len() {
        // Substitution.
        let mut substituted = chars.clone();
        substituted[i] = if chars[i] == 'x' { 'y' } else { 'x' };
        mutations.push(substituted.iter().collect::<String>());

        // Deletion.
        let mut deleted = chars.clone();
        deleted.remove(i);
        mutations.push(deleted.iter().collect::<String>());
    }
    // Insertion and case flip.
    mutations.push(format!("{}!", password));
    mutations.push("Secret1".to_string());

    for mutated in mutations {
        assert!(
            matches!(ctx.auth.login("ana", &mutated), Err(AuthError::Authentication)),
            "mutation {:?} must not verify",
            mutated
        );
    }
}

#[test]
fn every_role_round_trips_through_login() {
    let ctx = TestContext::new();
    for (i, role) in Role::ALL.into_iter().enumerate() {
        let username = format!("user{}", i);
        let account = NewAccount::new(&username, "password", "N", "A", format!("ced-{}", i));
        ctx.auth.create_account(&account, role).unwrap();

        let outcome = ctx.auth.login(&username, "password").unwrap();
        assert_eq!(ctx.auth.verify_token(&outcome.token).unwrap().role, role);
        assert!(ctx.auth.check_permission(&username, &[role]).unwrap());
    }
}

#[test]
fn concurrent_duplicate_registration_has_one_winner() {
    let ctx = TestContext::new();
    let contenders = 4;
    let barrier = Arc::new(Barrier::new(contenders));

    let handles: Vec<_> = (0..contenders)
        .map(|i| {
            let auth = ctx.auth.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let account =
                    NewAccount::new("ana", "secret1", "Ana", "Lopez", format!("ced-{}", i));
                barrier.wait();
                auth.register(&account)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AuthError::Conflict { field: "username" })))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(conflicts, contenders - 1);
    assert_eq!(ctx.store.len(), 1);
}

#[test]
fn sequential_duplicate_registration_conflicts() {
    let ctx = TestContext::new();
    ctx.auth.register(&ana()).unwrap();

    let mut again = ana();
    again.cedula = "999".to_string();
    let err = ctx.auth.register(&again).unwrap_err();
    assert!(matches!(err, AuthError::Conflict { field: "username" }));
    assert_eq!(err.to_string(), "username already exists");
}

/// Store that fails only role lookups, as an unreachable backend would.
struct FlakyRoleStore {
    inner: SledCredentialStore,
}

impl CredentialStore for FlakyRoleStore {
    fn find_principal_by_username(&self, username: &str) -> StoreResult<Principal> {
        self.inner.find_principal_by_username(username)
    }

    fn find_principal_by_id(&self, id: u64) -> StoreResult<Principal> {
        self.inner.find_principal_by_id(id)
    }

    fn find_role_by_username(&self, _username: &str) -> StoreResult<Role> {
        Err(StoreError::InvalidData("connection reset".into()))
    }

    fn insert_principal(&self, principal: NewPrincipal) -> StoreResult<u64> {
        self.inner.insert_principal(principal)
    }

    fn update_role(&self, username: &str, role: Role) -> StoreResult<()> {
        self.inner.update_role(username, role)
    }

    fn list_principals(&self) -> StoreResult<Vec<Principal>> {
        self.inner.list_principals()
    }
}

#[test]
fn lookup_fault_is_distinct_from_denial() {
    let store = FlakyRoleStore {
        inner: SledCredentialStore::open(&StoreConfig::temporary()).unwrap(),
    };
    let auth = AuthService::new(Arc::new(store), AuthConfig::new("secret").unwrap());
    auth.register(&ana()).unwrap();

    let err = auth.check_permission("ana", &[Role::User]).unwrap_err();
    assert!(matches!(err, AuthError::Infrastructure(_)));
    assert!(err.is_fault());

    // Unknown users fault too: the lookup never got an answer.
    assert!(auth.check_permission("ghost_user", &[Role::User]).is_err());
}

#[test]
fn tokens_from_another_deployment_are_rejected() {
    let ctx = TestContext::new();
    ctx.auth.register(&ana()).unwrap();
    let token = ctx.auth.login("ana", "secret1").unwrap().token;

    let other_store = Arc::new(SledCredentialStore::open(&StoreConfig::temporary()).unwrap());
    let other = AuthService::new(other_store, AuthConfig::new("another-secret").unwrap());
    assert!(matches!(other.verify_token(&token), Err(AuthError::InvalidToken)));
}
