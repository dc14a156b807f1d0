//! Request extractors.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use agrotrack_core::{strip_bearer, Principal};

use crate::error::ApiError;
use crate::state::AppState;

/// The principal behind the request's bearer token.
///
/// Rejects with 401 when the header is missing or the token does not verify.
pub struct CurrentUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(ApiError::MissingToken)?
            .to_str()
            .map_err(|_| ApiError::MissingToken)?;

        let token = strip_bearer(header).trim().to_string();
        if token.is_empty() {
            return Err(ApiError::MissingToken);
        }

        let principal = state
            .run_auth(move |auth| auth.authenticate_token(&token))
            .await?;
        Ok(CurrentUser(principal))
    }
}
