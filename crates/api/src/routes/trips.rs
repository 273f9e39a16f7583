//! Trip endpoints. Listings carry live seat availability; the detail view
//! adds the taken seats for seat-map rendering.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{RouteId, TrainId, TripId};
use domain::{NewTrip, Trip};
use serde::Deserialize;
use store::{RailwayStore, TripDetail, TripFilter, TripSummary};

use crate::AppState;
use crate::error::ApiError;

/// Query parameters for trip listings: exact route and/or train filter.
#[derive(Debug, Deserialize)]
pub struct TripQuery {
    pub route: Option<i64>,
    pub train: Option<i64>,
}

/// POST /api/trips
#[tracing::instrument(skip(state))]
pub async fn create<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(new): Json<NewTrip>,
) -> Result<(StatusCode, Json<Trip>), ApiError> {
    let created = state.store.create_trip(new).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/trips?route=&train=
#[tracing::instrument(skip(state))]
pub async fn list<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<TripQuery>,
) -> Result<Json<Vec<TripSummary>>, ApiError> {
    let filter = TripFilter {
        route: query.route.map(RouteId::new),
        train: query.train.map(TrainId::new),
    };
    Ok(Json(state.store.list_trips(filter).await?))
}

/// GET /api/trips/:id
#[tracing::instrument(skip(state))]
pub async fn get<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<TripDetail>, ApiError> {
    Ok(Json(state.store.get_trip(TripId::new(id)).await?))
}

/// PUT /api/trips/:id
#[tracing::instrument(skip(state))]
pub async fn update<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    Json(new): Json<NewTrip>,
) -> Result<Json<Trip>, ApiError> {
    Ok(Json(state.store.update_trip(TripId::new(id), new).await?))
}

/// DELETE /api/trips/:id
#[tracing::instrument(skip(state))]
pub async fn delete<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_trip(TripId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
