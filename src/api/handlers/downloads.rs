//! `/downloads/{filename}` — streams a settlement CSV report from disk.
//!
//! Filename shape is validated before touching the filesystem: minimum
//! length, a `.csv` suffix, and a stem that parses as a UUID (the job id).

use std::path::Path as StdPath;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::error::{AppError, AppResult, NotFoundKind};
use crate::AppState;

fn parse_job_id(filename: &str) -> Option<Uuid> {
    let path = StdPath::new(filename);
    let name = path.file_name()?.to_str()?;
    if name.len() <= 4 || !name.ends_with(".csv") {
        return None;
    }
    let stem = &name[..name.len() - 4];
    Uuid::parse_str(stem).ok()
}

pub async fn download_report(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job_id = parse_job_id(&filename)
        .ok_or_else(|| AppError::NotFound(NotFoundKind::File, format!("{filename} is not a valid report name")))?;

    let path = StdPath::new(&state.config.settlement_output_dir).join(format!("{job_id}.csv"));

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| AppError::NotFound(NotFoundKind::File, format!("report {filename} not found")))?;

    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_csv_and_short_names() {
        assert!(parse_job_id("a.csv").is_none());
        assert!(parse_job_id("not-a-uuid.csv").is_none());
        assert!(parse_job_id("report.txt").is_none());
    }

    #[test]
    fn accepts_uuid_stem_with_csv_suffix() {
        let id = Uuid::new_v4();
        let filename = format!("{id}.csv");
        assert_eq!(parse_job_id(&filename), Some(id));
    }
}
