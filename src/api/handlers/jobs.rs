//! `/jobs` handlers: submission, status, cancellation.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::job::{JobStatusResponse, JobSubmittedResponse};
use crate::models::settlement::SettlementJobRequest;
use crate::AppState;

pub async fn submit_settlement(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SettlementJobRequest>,
) -> AppResult<impl IntoResponse> {
    let job = state.job_engine.submit_settlement(req).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(JobSubmittedResponse {
            job_id: job.id,
            status: job.status,
        }),
    ))
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let job = state.job_engine.get_job(id).await?;
    Ok(Json(JobStatusResponse::from(job)))
}

#[derive(Serialize)]
struct CancelResponse {
    message: &'static str,
}

pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state.job_engine.cancel(id).await?;
    Ok(Json(CancelResponse {
        message: "cancellation requested",
    }))
}
