//! Route configuration and setup

use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use waypost::PanicResponder;

use crate::handlers;
use crate::state::AppState;

const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Router<()> {
    let panic_layer = PanicResponder::layer(state.reporter.clone());
    let http_concurrency_limit = state.config.http_concurrency_limit;

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/errors/plain", get(handlers::errors::plain_error))
        .route("/errors/traced", get(handlers::errors::traced_error))
        .route("/errors/report", get(handlers::errors::custom_report))
        .route("/errors/nested/{id}", get(handlers::errors::nested_lookup))
        .route("/panic", get(handlers::errors::trigger_panic))
        .route(
            "/admin/verbosity",
            put(handlers::admin::set_verbosity).get(handlers::admin::get_verbosity),
        )
        .with_state(state)
        // Innermost: recovered panics still get a normal response from the layers above.
        .layer(panic_layer)
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(TraceLayer::new_for_http())
}
