//! Typed access to the `products` table, plus the conditional stock decrement
//! that is the crux of the Order Allocator's concurrency story.

use sqlx::{Postgres, Transaction};

use crate::models::product::{DecrementOutcome, Product};

/// Fetch a product, taking the row lock the storage engine provides
/// (`SELECT ... FOR UPDATE`), inside the caller's transaction.
pub async fn lock_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, stock, price, version, created_at, updated_at
        FROM products
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn find(pool: &sqlx::PgPool, id: i64) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, stock, price, version, created_at, updated_at
        FROM products
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Decrement `stock` by `qty` and bump `version`, but only if the stored
/// version still equals `expected_version` and stock is sufficient. The
/// outcome is decided from `rows_affected`; on zero rows a follow-up read
/// disambiguates an out-of-stock row from a version mismatch.
pub async fn decrement_stock(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    qty: i64,
    expected_version: i64,
) -> Result<DecrementOutcome, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - $1, version = version + 1, updated_at = now()
        WHERE id = $2 AND version = $3 AND stock >= $1
        "#,
    )
    .bind(qty)
    .bind(id)
    .bind(expected_version)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(DecrementOutcome::Ok);
    }

    // Zero rows: either the row is out of stock, or another writer already
    // bumped the version out from under us. The row lock taken earlier in
    // the same transaction means this read sees the authoritative state.
    let current = sqlx::query_as::<_, Product>(
        r#"SELECT id, name, stock, price, version, created_at, updated_at FROM products WHERE id = $1"#,
    )
    .bind(id)
    .fetch_one(&mut **tx)
    .await?;

    if current.stock < qty {
        Ok(DecrementOutcome::OutOfStock)
    } else {
        Ok(DecrementOutcome::ConcurrencyConflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrement_outcome_variants_are_distinct() {
        assert_ne!(DecrementOutcome::Ok, DecrementOutcome::OutOfStock);
        assert_ne!(DecrementOutcome::OutOfStock, DecrementOutcome::ConcurrencyConflict);
    }
}
