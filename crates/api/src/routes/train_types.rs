//! Train type CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::TrainTypeId;
use domain::{NewTrainType, TrainType};
use store::RailwayStore;

use crate::AppState;
use crate::error::ApiError;

/// POST /api/train_types
#[tracing::instrument(skip(state))]
pub async fn create<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(new): Json<NewTrainType>,
) -> Result<(StatusCode, Json<TrainType>), ApiError> {
    let created = state.store.create_train_type(new).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/train_types
#[tracing::instrument(skip(state))]
pub async fn list<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<TrainType>>, ApiError> {
    Ok(Json(state.store.list_train_types().await?))
}

/// GET /api/train_types/:id
#[tracing::instrument(skip(state))]
pub async fn get<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<TrainType>, ApiError> {
    Ok(Json(state.store.get_train_type(TrainTypeId::new(id)).await?))
}

/// PUT /api/train_types/:id
#[tracing::instrument(skip(state))]
pub async fn update<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    Json(new): Json<NewTrainType>,
) -> Result<Json<TrainType>, ApiError> {
    Ok(Json(
        state
            .store
            .update_train_type(TrainTypeId::new(id), new)
            .await?,
    ))
}

/// DELETE /api/train_types/:id
#[tracing::instrument(skip(state))]
pub async fn delete<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_train_type(TrainTypeId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
