//! Crew CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::CrewId;
use domain::{Crew, NewCrew};
use store::RailwayStore;

use crate::AppState;
use crate::error::ApiError;

/// POST /api/crews
#[tracing::instrument(skip(state))]
pub async fn create<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(new): Json<NewCrew>,
) -> Result<(StatusCode, Json<Crew>), ApiError> {
    let created = state.store.create_crew(new).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/crews
#[tracing::instrument(skip(state))]
pub async fn list<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Crew>>, ApiError> {
    Ok(Json(state.store.list_crews().await?))
}

/// GET /api/crews/:id
#[tracing::instrument(skip(state))]
pub async fn get<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<Crew>, ApiError> {
    Ok(Json(state.store.get_crew(CrewId::new(id)).await?))
}

/// PUT /api/crews/:id
#[tracing::instrument(skip(state))]
pub async fn update<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    Json(new): Json<NewCrew>,
) -> Result<Json<Crew>, ApiError> {
    Ok(Json(state.store.update_crew(CrewId::new(id), new).await?))
}

/// DELETE /api/crews/:id
#[tracing::instrument(skip(state))]
pub async fn delete<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_crew(CrewId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
