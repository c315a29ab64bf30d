//! Typed, paginated access to COMPLETED `transactions` for the Settlement
//! Aggregator. Pages are ordered by identity so a run can resume cleanly
//! from an offset.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::transaction::Transaction;

/// Total COMPLETED transactions in `[from, to)`, used as the progress
/// denominator before a run starts paging.
pub async fn count(pool: &PgPool, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM transactions
        WHERE status = 'COMPLETED' AND paid_at >= $1 AND paid_at < $2
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// A page of up to `limit` COMPLETED transactions in `[from, to)`, ordered by
/// id, starting at `offset`. An empty page signals end of the window.
pub async fn page(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        r#"
        SELECT id, merchant_id, amount, fee, status, paid_at, created_at
        FROM transactions
        WHERE status = 'COMPLETED' AND paid_at >= $1 AND paid_at < $2
        ORDER BY id ASC
        OFFSET $3 LIMIT $4
        "#,
    )
    .bind(from)
    .bind(to)
    .bind(offset)
    .bind(limit)
    .fetch_all(pool)
    .await
}
