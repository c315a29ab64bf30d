//! `/health` — liveness plus a bounded storage reachability probe.
//!
//! Tracks the database check as a plain boolean rather than sniffing driver
//! error strings.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    checks: HealthChecks,
}

#[derive(Serialize)]
struct HealthChecks {
    database: &'static str,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database_healthy = state.db.health_check().await;

    let body = HealthResponse {
        status: if database_healthy { "healthy" } else { "unhealthy" },
        checks: HealthChecks {
            database: if database_healthy { "healthy" } else { "unhealthy" },
        },
    };

    let status = if database_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(body))
}
