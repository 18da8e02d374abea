//! HTTP API for the marketplace fulfillment engine.
//!
//! Exposes order placement, cancellation, vendor fulfillment, the product
//! registry and vendor notifications over REST, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use store::MarketplaceStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use error::ApiError;
pub use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: MarketplaceStore>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", patch(routes::orders::update_status::<S>))
        .route("/orders/{id}/cancel", patch(routes::orders::cancel::<S>))
        .route(
            "/orders/{id}/items/{product_id}/ready",
            put(routes::orders::set_item_ready::<S>),
        )
        .route("/orders/vendor/{vendor_id}", get(routes::orders::by_vendor::<S>))
        .route(
            "/orders/customer/{customer_id}",
            get(routes::orders::by_customer::<S>),
        )
        .route(
            "/products",
            post(routes::products::register::<S>).get(routes::products::list::<S>),
        )
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/products/{id}/restock", post(routes::products::restock::<S>))
        .route(
            "/products/{id}/pending-orders",
            get(routes::products::pending_orders::<S>),
        )
        .route("/notifications", get(routes::notifications::list::<S>))
        // `{id}` is a vendor id here; the segment name must match the read route.
        .route(
            "/notifications/{id}",
            get(routes::notifications::for_vendor::<S>),
        )
        .route(
            "/notifications/{id}/read",
            put(routes::notifications::mark_read::<S>),
        )
        .fallback(route_not_found)
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

/// Creates the application state over the given store.
pub fn create_state<S: MarketplaceStore>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store))
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("route not found".to_string())
}
