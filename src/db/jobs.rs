//! Typed access to the `jobs` table: lifecycle, progress, and the
//! conditional status updates that make cancellation and completion races
//! safe without an application-level lock.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::job::{Job, JobStatus, JobType};

pub async fn create(pool: &PgPool, job_type: JobType, parameters: serde_json::Value) -> Result<Job, sqlx::Error> {
    sqlx::query_as::<_, Job>(
        r#"
        INSERT INTO jobs (id, job_type, status, progress, processed, total, parameters, created_at, updated_at)
        VALUES ($1, $2, 'QUEUED', 0, 0, 0, $3, now(), now())
        RETURNING id, job_type, status, progress, processed, total, parameters,
                  result_path, download_url, error, started_at, completed_at, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(job_type)
    .bind(parameters)
    .fetch_one(pool)
    .await
}

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(
        r#"
        SELECT id, job_type, status, progress, processed, total, parameters,
               result_path, download_url, error, started_at, completed_at, created_at, updated_at
        FROM jobs
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// QUEUED -> RUNNING, stamping `started_at`. No-op guard: only applies from
/// QUEUED, though in this design only the worker that dequeued the job calls it.
pub async fn mark_running(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET status = 'RUNNING', started_at = now(), updated_at = now()
        WHERE id = $1 AND status = 'QUEUED'
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_progress(
    pool: &PgPool,
    id: Uuid,
    processed: i64,
    total: i64,
    progress: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET processed = $2, total = $3, progress = $4, updated_at = now()
        WHERE id = $1 AND status = 'RUNNING'
        "#,
    )
    .bind(id)
    .bind(processed)
    .bind(total)
    .bind(progress)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_completed(
    pool: &PgPool,
    id: Uuid,
    result_path: &str,
    download_url: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET status = 'COMPLETED', progress = 100.0, processed = total,
            result_path = $2, download_url = $3, completed_at = now(), updated_at = now()
        WHERE id = $1 AND status = 'RUNNING'
        "#,
    )
    .bind(id)
    .bind(result_path)
    .bind(download_url)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_failed(pool: &PgPool, id: Uuid, error: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET status = 'FAILED', error = $2, completed_at = now(), updated_at = now()
        WHERE id = $1 AND status IN ('QUEUED', 'RUNNING')
        "#,
    )
    .bind(id)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(())
}

/// The worker's own record of having observed cancellation mid-run. Storage
/// already holds CANCELLED (set by `cancel`); this just stamps `completed_at`
/// if the worker reaches its exit path first.
pub async fn mark_cancelled(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET status = 'CANCELLED', completed_at = now(), updated_at = now()
        WHERE id = $1 AND status IN ('QUEUED', 'RUNNING')
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Conditional status update: QUEUED|RUNNING -> CANCELLED. Returns `true`
/// when a row actually flipped; `false` means the job was already terminal
/// (caller should surface `JobAlreadyCancelled`).
pub async fn cancel(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET status = 'CANCELLED', completed_at = now(), updated_at = now()
        WHERE id = $1 AND status IN ('QUEUED', 'RUNNING')
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn is_cancelled(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let status: Option<(JobStatus,)> = sqlx::query_as("SELECT status FROM jobs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(matches!(status, Some((JobStatus::Cancelled,))))
}
