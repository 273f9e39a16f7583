//! Train CRUD endpoints. Listings resolve the type name and capacity.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::TrainId;
use domain::NewTrain;
use serde::Deserialize;
use store::{NameFilter, RailwayStore, TrainView};

use crate::AppState;
use crate::error::ApiError;

/// Query parameters for train listings.
#[derive(Debug, Deserialize)]
pub struct TrainQuery {
    /// Case-insensitive substring match on the train name.
    pub name: Option<String>,
}

/// POST /api/trains
#[tracing::instrument(skip(state))]
pub async fn create<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(new): Json<NewTrain>,
) -> Result<(StatusCode, Json<TrainView>), ApiError> {
    let created = state.store.create_train(new).await?;
    let view = state.store.get_train(created.id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/trains?name=
#[tracing::instrument(skip(state))]
pub async fn list<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<TrainQuery>,
) -> Result<Json<Vec<TrainView>>, ApiError> {
    let filter = NameFilter { name: query.name };
    Ok(Json(state.store.list_trains(filter).await?))
}

/// GET /api/trains/:id
#[tracing::instrument(skip(state))]
pub async fn get<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<TrainView>, ApiError> {
    Ok(Json(state.store.get_train(TrainId::new(id)).await?))
}

/// PUT /api/trains/:id
#[tracing::instrument(skip(state))]
pub async fn update<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    Json(new): Json<NewTrain>,
) -> Result<Json<TrainView>, ApiError> {
    let updated = state.store.update_train(TrainId::new(id), new).await?;
    Ok(Json(state.store.get_train(updated.id).await?))
}

/// DELETE /api/trains/:id
#[tracing::instrument(skip(state))]
pub async fn delete<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_train(TrainId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
