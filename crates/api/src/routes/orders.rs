//! Order endpoints: atomic creation and owner-scoped history.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use common::OrderId;
use domain::TicketRequest;
use serde::Deserialize;
use store::{DEFAULT_PAGE_SIZE, OrderView, Page, PageRequest, RailwayStore};

use crate::AppState;
use crate::auth;
use crate::error::ApiError;

/// Request body for order creation.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub tickets: Vec<TicketRequest>,
}

/// Pagination query parameters for order listings.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// POST /api/orders — atomically create an order with all its tickets.
///
/// Any invalid or conflicting ticket aborts the whole order; nothing is
/// persisted on failure.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderView>), ApiError> {
    let user = auth::require_user(&state.store, &headers).await?;

    let ticket_count = req.tickets.len();
    let order = state.store.create_order(user.id, req.tickets).await?;

    metrics::counter!("orders_created_total").increment(1);
    metrics::counter!("tickets_sold_total").increment(ticket_count as u64);

    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders — the caller's orders, newest first, paginated.
#[tracing::instrument(skip(state, headers))]
pub async fn list<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<OrderView>>, ApiError> {
    let user = auth::require_user(&state.store, &headers).await?;
    let page = PageRequest::new(
        query.page.unwrap_or(1),
        query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    );
    Ok(Json(state.store.list_orders(user.id, page).await?))
}

/// GET /api/orders/:id — a single order, owner-scoped.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: RailwayStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<OrderView>, ApiError> {
    let user = auth::require_user(&state.store, &headers).await?;
    Ok(Json(state.store.get_order(user.id, OrderId::new(id)).await?))
}
