//! User administration.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use agrotrack_core::{AuditEvent, NewAccount, Profile, Role, UnknownRole};

use super::auth::{invalid_body, CreatedResponse, ProfileResponse};
use crate::error::{ApiError, Result};
use crate::extract::CurrentUser;
use crate::state::AppState;

/// Roles allowed to list and provision users.
const USER_MANAGERS: &[Role] = &[Role::Admin, Role::Gerente];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(provision_user))
        .route("/api/users/:username/role", put(change_role))
}

#[derive(Serialize)]
struct UserListResponse {
    success: bool,
    users: Vec<Profile>,
    count: usize,
}

#[derive(Deserialize)]
struct ChangeRoleRequest {
    role: String,
}

async fn list_users(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<UserListResponse>> {
    state
        .require_role(&principal, "list_users", USER_MANAGERS)
        .await?;

    let users = state.run_auth(|auth| auth.list_profiles()).await?;
    Ok(Json(UserListResponse {
        success: true,
        count: users.len(),
        users,
    }))
}

async fn provision_user(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    payload: std::result::Result<Json<NewAccount>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    state
        .require_role(&principal, "provision_user", USER_MANAGERS)
        .await?;

    let Json(account) = payload.map_err(invalid_body)?;
    let username = account.username.clone();

    let id = state.run_auth(move |auth| auth.provision(&account)).await?;
    state.audit.record(AuditEvent::account_provisioned(
        &principal.username,
        &username,
        Role::Encargado,
    ));

    Ok((StatusCode::CREATED, Json(CreatedResponse { success: true, id })))
}

async fn change_role(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(target): Path<String>,
    payload: std::result::Result<Json<ChangeRoleRequest>, JsonRejection>,
) -> Result<Json<ProfileResponse>> {
    state
        .require_role(&principal, "change_role", &[Role::Admin])
        .await?;

    let Json(request) = payload.map_err(invalid_body)?;
    let role: Role = request
        .role
        .parse()
        .map_err(|e: UnknownRole| ApiError::InvalidRequest(e.to_string()))?;

    let actor = principal.username.clone();
    let target_name = target.clone();
    let user = state
        .run_auth(move |auth| {
            auth.change_role(&actor, &target_name, role)?;
            auth.profile(&target_name)
        })
        .await?;

    state
        .audit
        .record(AuditEvent::role_changed(&principal.username, &target, role));

    Ok(Json(ProfileResponse {
        success: true,
        user,
    }))
}
