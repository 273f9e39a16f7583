//! Route CRUD endpoints. Listings resolve station names; detail carries
//! full station data on both ends.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::RouteId;
use domain::{NewRoute, Route};
use store::{RailwayStore, RouteDetail, RouteSummary};

use crate::AppState;
use crate::error::ApiError;

/// POST /api/routes
#[tracing::instrument(skip(state))]
pub async fn create<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(new): Json<NewRoute>,
) -> Result<(StatusCode, Json<Route>), ApiError> {
    let created = state.store.create_route(new).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/routes
#[tracing::instrument(skip(state))]
pub async fn list<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<RouteSummary>>, ApiError> {
    Ok(Json(state.store.list_routes().await?))
}

/// GET /api/routes/:id
#[tracing::instrument(skip(state))]
pub async fn get<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<RouteDetail>, ApiError> {
    Ok(Json(state.store.get_route(RouteId::new(id)).await?))
}

/// PUT /api/routes/:id
#[tracing::instrument(skip(state))]
pub async fn update<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    Json(new): Json<NewRoute>,
) -> Result<Json<Route>, ApiError> {
    Ok(Json(state.store.update_route(RouteId::new(id), new).await?))
}

/// DELETE /api/routes/:id
#[tracing::instrument(skip(state))]
pub async fn delete<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_route(RouteId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
