//! Registration, login and the current principal.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use agrotrack_core::{AuditEvent, AuthError, NewAccount, Profile, Role};

use crate::error::{ApiError, Result};
use crate::extract::CurrentUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
pub(crate) struct CreatedResponse {
    pub success: bool,
    pub id: u64,
}

#[derive(Serialize)]
struct LoginResponse {
    success: bool,
    token: String,
    user: Profile,
}

#[derive(Serialize)]
pub(crate) struct ProfileResponse {
    pub success: bool,
    pub user: Profile,
}

/// Map a body that failed to parse to a 400.
pub(crate) fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError::InvalidRequest(rejection.body_text())
}

async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewAccount>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let Json(account) = payload.map_err(invalid_body)?;
    let username = account.username.clone();

    let id = state.run_auth(move |auth| auth.register(&account)).await?;
    state
        .audit
        .record(AuditEvent::account_registered(&username, Role::User));

    Ok((StatusCode::CREATED, Json(CreatedResponse { success: true, id })))
}

async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let Json(LoginRequest { username, password }) = payload.map_err(invalid_body)?;
    let actor = username.clone();

    match state
        .run_auth(move |auth| auth.login(&username, &password))
        .await
    {
        Ok(outcome) => {
            state.audit.record(AuditEvent::login_succeeded(&actor));
            Ok(Json(LoginResponse {
                success: true,
                token: outcome.token,
                user: outcome.profile,
            }))
        }
        Err(ApiError::Auth(AuthError::Authentication)) => {
            state.audit.record(AuditEvent::login_failed(&actor));
            Err(AuthError::Authentication.into())
        }
        Err(e) => Err(e),
    }
}

async fn me(CurrentUser(principal): CurrentUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        success: true,
        user: principal.into(),
    })
}
