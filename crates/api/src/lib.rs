//! HTTP API server with observability for the marketplace core.
//!
//! Exposes catalog discovery, seller item management, and the order
//! lifecycle over REST, with structured logging (tracing) and Prometheus
//! metrics. Authentication happens upstream; this service trusts the
//! principal headers the gateway stamps on each request.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post, put};
use catalog::{CatalogStore, InMemoryCatalogStore};
use metrics_exporter_prometheus::PrometheusHandle;
use orders::{InMemoryOrderStore, OrderLedger, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<C: CatalogStore, S: OrderStore> {
    pub catalog: C,
    pub ledger: OrderLedger<C, S>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<C, S>(state: Arc<AppState<C, S>>, metrics_handle: PrometheusHandle) -> Router
where
    C: CatalogStore + Clone + 'static,
    S: OrderStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/items", get(routes::items::list_nearby::<C, S>))
        .route("/items", post(routes::items::create::<C, S>))
        .route("/items/{id}", get(routes::items::get::<C, S>))
        .route("/items/{id}", put(routes::items::update::<C, S>))
        .route("/items/{id}/stock", post(routes::items::adjust_stock::<C, S>))
        .route("/my/items", get(routes::items::my_items::<C, S>))
        .route("/orders", post(routes::orders::create::<C, S>))
        .route("/orders", get(routes::orders::list::<C, S>))
        .route("/orders/{id}", get(routes::orders::get::<C, S>))
        .route(
            "/orders/{id}/status",
            patch(routes::orders::update_status::<C, S>),
        )
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<C, S>))
        .route(
            "/orders/{id}/payment",
            post(routes::orders::record_payment::<C, S>),
        )
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

/// Creates application state over the in-memory stores.
pub fn create_default_state() -> Arc<AppState<InMemoryCatalogStore, InMemoryOrderStore>> {
    let catalog = InMemoryCatalogStore::new();
    let ledger = OrderLedger::new(catalog.clone(), InMemoryOrderStore::new());
    Arc::new(AppState { catalog, ledger })
}
