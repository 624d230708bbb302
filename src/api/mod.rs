use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::middleware::metrics::track_metrics;
use crate::middleware::request_id::request_id_middleware;
use crate::AppState;

pub mod handlers;

/// Build the public router: the four auth flows plus health and metrics.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/auth/register", post(handlers::register))
        .route("/v1/auth/login", post(handlers::login))
        .route("/v1/auth/verify", post(handlers::verify_token))
        .route("/v1/auth/logout", post(handlers::logout))
        .route("/healthz", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        // route_layer: only matched routes are counted
        .route_layer(middleware::from_fn_with_state(state.clone(), track_metrics))
        .fallback(fallback_404)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
}

async fn fallback_404() -> AppError {
    AppError::NotFound("Resource Not Found".into())
}
