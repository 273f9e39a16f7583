//! Bearer-token authentication against the identity records in the store.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use store::{RailwayStore, User};

use crate::error::ApiError;

/// Resolves the authenticated user from an `Authorization: Bearer <token>`
/// header, failing with 401 when the header is missing, malformed or the
/// token is unknown.
pub async fn require_user<S: RailwayStore>(store: &S, headers: &HeaderMap) -> Result<User, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;
    store
        .user_for_token(token)
        .await?
        .ok_or(ApiError::Unauthorized)
}
