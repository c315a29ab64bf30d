//! `/metrics` — Prometheus text exposition of the installed recorder.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;

use crate::AppState;

pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.metrics_handle.render()
}
