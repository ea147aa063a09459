//! HTTP API server with observability for the payment service.
//!
//! Exposes payment creation, status queries and order finalization as REST
//! endpoints, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use chrono::FixedOffset;
use metrics_exporter_prometheus::PrometheusHandle;
use payments::{Collaborators, OrderFinalizer, PaymentIntentCreator, QueryService};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub intents: PaymentIntentCreator,
    pub finalizer: OrderFinalizer,
    pub queries: QueryService,
}

impl AppState {
    /// Builds the three payment services over one set of collaborators.
    pub fn new(
        deps: Collaborators,
        notify_topic: impl Into<String>,
        display_offset: FixedOffset,
    ) -> Self {
        Self {
            intents: PaymentIntentCreator::new(deps.clone()),
            finalizer: OrderFinalizer::with_topic(deps.clone(), notify_topic),
            queries: QueryService::new(deps, display_offset),
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let payment_routes = Router::new()
        .route("/save", post(routes::payments::save))
        .route("/status", get(routes::payments::status))
        .route("/order-status", get(routes::payments::order_status))
        .route("/list", get(routes::payments::list))
        .route("/callback/{payment_id}", get(routes::payments::callback));

    Router::new()
        .route("/health", get(routes::health::check))
        .nest("/api/payment/v1", payment_routes)
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
