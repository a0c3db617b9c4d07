//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::campaigns::{get_campaign, get_edit_history, list_scenes};
use crate::handlers::edits::submit_edit;
use crate::handlers::jobs::{cancel_job, get_job_status};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let campaign_routes = Router::new()
        .route("/campaigns/:campaign_id", get(get_campaign))
        .route("/campaigns/:campaign_id/scenes", get(list_scenes))
        .route(
            "/campaigns/:campaign_id/scenes/:scene_index/edit",
            post(submit_edit),
        )
        .route("/campaigns/:campaign_id/edit-history", get(get_edit_history));

    let job_routes = Router::new()
        .route("/jobs/:job_id/status", get(get_job_status))
        .route("/jobs/:job_id/cancel", post(cancel_job));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(campaign_routes)
        .merge(job_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
