//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    create_render, delete_render, download_render, generate_novel, get_render, get_render_status,
    get_task_status, health, list_renders, novel_to_all, novel_to_video,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let ai_routes = Router::new()
        .route("/ai/novel-to-video", post(novel_to_video))
        .route("/ai/novel-to-all", post(novel_to_all))
        .route("/ai/generate-novel", post(generate_novel))
        .route("/task/:task_id/status", get(get_task_status));

    let render_routes = Router::new()
        .route("/renders", post(create_render).get(list_renders))
        .route("/renders/:render_id", get(get_render).delete(delete_render))
        .route("/renders/:render_id/status", get(get_render_status))
        .route("/renders/:render_id/download", get(download_render));

    let api_routes = Router::new().merge(ai_routes).merge(render_routes);

    let health_routes = Router::new().route("/health", get(health));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api/v1", api_routes)
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
