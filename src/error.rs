//! Central error taxonomy and HTTP mapping.
//!
//! Domain errors bubble unchanged from storage through service to handler;
//! this module is the one place that converts them to the wire shape.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// Which entity a `NotFound` refers to, so the wire code doesn't depend on
/// sniffing substrings out of a human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    Product,
    Order,
    Job,
    File,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(NotFoundKind, String),

    #[error("product {0} is out of stock")]
    OutOfStock(i64),

    #[error("concurrent modification of product {0}, retry")]
    ConcurrencyConflict(i64),

    #[error("job {0} is already in a terminal state")]
    JobAlreadyCancelled(uuid::Uuid),

    #[error("queue is full")]
    QueueFull,

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(NotFoundKind::Job, _) => "JOB_NOT_FOUND",
            AppError::NotFound(NotFoundKind::File, _) => "FILE_NOT_FOUND",
            AppError::NotFound(_, _) => "NOT_FOUND",
            AppError::OutOfStock(_) => "OUT_OF_STOCK",
            AppError::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            AppError::JobAlreadyCancelled(_) => "JOB_ALREADY_CANCELLED",
            AppError::QueueFull => "SERVICE_UNAVAILABLE",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_, _) => StatusCode::NOT_FOUND,
            AppError::OutOfStock(_) => StatusCode::CONFLICT,
            AppError::ConcurrencyConflict(_) => StatusCode::CONFLICT,
            AppError::JobAlreadyCancelled(_) => StatusCode::CONFLICT,
            AppError::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let code = self.code();

        // Unknown/internal errors get a generic message on the wire; the real
        // cause only ever reaches the logs.
        let (message, details) = match &self {
            AppError::Internal(cause) => {
                tracing::error!(error = %cause, "internal error");
                ("internal server error".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
