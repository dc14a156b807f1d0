//! Audit log listing.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use agrotrack_core::{AuditEvent, Role};

use crate::error::{ApiError, Result};
use crate::extract::CurrentUser;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/audit", get(list_events))
}

#[derive(Deserialize)]
struct AuditQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct AuditListResponse {
    success: bool,
    events: Vec<AuditEvent>,
    dropped: u64,
}

async fn list_events(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Query(query): Query<AuditQuery>,
) -> Result<Json<AuditListResponse>> {
    state
        .require_role(&principal, "list_audit", &[Role::Admin])
        .await?;

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let log = state.audit_log.clone();
    let events = tokio::task::spawn_blocking(move || log.recent(limit))
        .await
        .map_err(|e| ApiError::Internal(format!("audit task failed: {}", e)))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(AuditListResponse {
        success: true,
        events,
        dropped: state.audit.dropped(),
    }))
}
