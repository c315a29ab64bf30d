//! Typed access to the `orders` table.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::order::Order;

/// Insert a CONFIRMED order row inside the caller's transaction.
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    product_id: i64,
    buyer_id: &str,
    quantity: i64,
    total: i64,
) -> Result<Order, sqlx::Error> {
    sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (id, product_id, buyer_id, quantity, status, total, created_at, updated_at)
        VALUES ($1, $2, $3, $4, 'CONFIRMED', $5, now(), now())
        RETURNING id, product_id, buyer_id, quantity, status, total, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(product_id)
    .bind(buyer_id)
    .bind(quantity)
    .bind(total)
    .fetch_one(&mut **tx)
    .await
}

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(
        r#"
        SELECT id, product_id, buyer_id, quantity, status, total, created_at, updated_at
        FROM orders
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Most-recent-first page of orders. `limit` and `offset` are expected to
/// already be clamped by the caller.
pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(
        r#"
        SELECT id, product_id, buyer_id, quantity, status, total, created_at, updated_at
        FROM orders
        ORDER BY created_at DESC, id DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}
