//! HTTP API server with observability for the railway booking system.
//!
//! Provides REST endpoints for reference-data CRUD, trip projections and
//! atomic order creation, with structured logging (tracing) and Prometheus
//! metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use store::RailwayStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub store: S,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: RailwayStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/users/register", post(routes::users::register::<S>))
        .route("/api/users/login", post(routes::users::login::<S>))
        .route(
            "/api/users/me",
            get(routes::users::me::<S>).put(routes::users::update_me::<S>),
        )
        .route(
            "/api/train_types",
            get(routes::train_types::list::<S>).post(routes::train_types::create::<S>),
        )
        .route(
            "/api/train_types/{id}",
            get(routes::train_types::get::<S>)
                .put(routes::train_types::update::<S>)
                .delete(routes::train_types::delete::<S>),
        )
        .route(
            "/api/trains",
            get(routes::trains::list::<S>).post(routes::trains::create::<S>),
        )
        .route(
            "/api/trains/{id}",
            get(routes::trains::get::<S>)
                .put(routes::trains::update::<S>)
                .delete(routes::trains::delete::<S>),
        )
        .route(
            "/api/crews",
            get(routes::crews::list::<S>).post(routes::crews::create::<S>),
        )
        .route(
            "/api/crews/{id}",
            get(routes::crews::get::<S>)
                .put(routes::crews::update::<S>)
                .delete(routes::crews::delete::<S>),
        )
        .route(
            "/api/stations",
            get(routes::stations::list::<S>).post(routes::stations::create::<S>),
        )
        .route(
            "/api/stations/{id}",
            get(routes::stations::get::<S>)
                .put(routes::stations::update::<S>)
                .delete(routes::stations::delete::<S>),
        )
        .route(
            "/api/routes",
            get(routes::route::list::<S>).post(routes::route::create::<S>),
        )
        .route(
            "/api/routes/{id}",
            get(routes::route::get::<S>)
                .put(routes::route::update::<S>)
                .delete(routes::route::delete::<S>),
        )
        .route(
            "/api/trips",
            get(routes::trips::list::<S>).post(routes::trips::create::<S>),
        )
        .route(
            "/api/trips/{id}",
            get(routes::trips::get::<S>)
                .put(routes::trips::update::<S>)
                .delete(routes::trips::delete::<S>),
        )
        .route(
            "/api/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route("/api/orders/{id}", get(routes::orders::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
