//! User registration, login and profile endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use store::{NewUser, RailwayStore, User};

use crate::AppState;
use crate::auth;
use crate::error::ApiError;

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Issued bearer token.
#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// POST /api/users/register
#[tracing::instrument(skip(state, new))]
pub async fn register<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(new): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.store.register_user(new).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/users/login — verify credentials and issue a token.
#[tracing::instrument(skip(state, req))]
pub async fn login<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.store.login(&req.username, &req.password).await?;
    Ok(Json(TokenResponse { token }))
}

/// GET /api/users/me
#[tracing::instrument(skip(state, headers))]
pub async fn me<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<User>, ApiError> {
    let user = auth::require_user(&state.store, &headers).await?;
    Ok(Json(user))
}

/// PUT /api/users/me
#[tracing::instrument(skip(state, headers, new))]
pub async fn update_me<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(new): Json<NewUser>,
) -> Result<Json<User>, ApiError> {
    let user = auth::require_user(&state.store, &headers).await?;
    Ok(Json(state.store.update_user(user.id, new).await?))
}
