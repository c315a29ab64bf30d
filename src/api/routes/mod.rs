use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::api::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics_endpoint))
        .route("/orders", post(handlers::orders::create_order))
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/jobs/settlement", post(handlers::jobs::submit_settlement))
        .route("/jobs/:id", get(handlers::jobs::get_job))
        .route("/jobs/:id/cancel", post(handlers::jobs::cancel_job))
        .route("/downloads/:filename", get(handlers::downloads::download_report))
        .with_state(state)
}
