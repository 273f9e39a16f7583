//! Station CRUD endpoints. Responses carry the derived `square` scalar.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::StationId;
use domain::NewStation;
use serde::Deserialize;
use store::{NameFilter, RailwayStore, StationView};

use crate::AppState;
use crate::error::ApiError;

/// Query parameters for station listings.
#[derive(Debug, Deserialize)]
pub struct StationQuery {
    /// Case-insensitive substring match on the station name.
    pub name: Option<String>,
}

/// POST /api/stations
#[tracing::instrument(skip(state))]
pub async fn create<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(new): Json<NewStation>,
) -> Result<(StatusCode, Json<StationView>), ApiError> {
    let created = state.store.create_station(new).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /api/stations?name=
#[tracing::instrument(skip(state))]
pub async fn list<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<StationQuery>,
) -> Result<Json<Vec<StationView>>, ApiError> {
    let filter = NameFilter { name: query.name };
    let stations = state.store.list_stations(filter).await?;
    Ok(Json(stations.into_iter().map(Into::into).collect()))
}

/// GET /api/stations/:id
#[tracing::instrument(skip(state))]
pub async fn get<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<StationView>, ApiError> {
    let station = state.store.get_station(StationId::new(id)).await?;
    Ok(Json(station.into()))
}

/// PUT /api/stations/:id
#[tracing::instrument(skip(state))]
pub async fn update<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    Json(new): Json<NewStation>,
) -> Result<Json<StationView>, ApiError> {
    let updated = state.store.update_station(StationId::new(id), new).await?;
    Ok(Json(updated.into()))
}

/// DELETE /api/stations/:id
#[tracing::instrument(skip(state))]
pub async fn delete<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_station(StationId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
