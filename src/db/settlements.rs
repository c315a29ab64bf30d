//! Typed access to the `settlements` table. Upsert is additive by design:
//! on conflict the incoming gross/fee/net/txn_count are ADDED to the stored
//! row rather than replacing it. Re-running the same window over unchanged
//! transactions double-counts; callers are responsible for not doing that.

use chrono::Utc;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::models::settlement::SettlementRow;

pub async fn upsert(
    tx: &mut Transaction<'_, Postgres>,
    row: &SettlementRow,
    unique_run_id: Uuid,
) -> Result<(), sqlx::Error> {
    let generated_at = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO settlements
            (merchant_id, date, gross, fee, net, txn_count, generated_at, unique_run_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now())
        ON CONFLICT (merchant_id, date) DO UPDATE SET
            gross = settlements.gross + EXCLUDED.gross,
            fee = settlements.fee + EXCLUDED.fee,
            net = settlements.net + EXCLUDED.net,
            txn_count = settlements.txn_count + EXCLUDED.txn_count,
            generated_at = EXCLUDED.generated_at,
            unique_run_id = EXCLUDED.unique_run_id,
            updated_at = now()
        "#,
    )
    .bind(&row.merchant_id)
    .bind(row.date)
    .bind(row.gross)
    .bind(row.fee)
    .bind(row.net)
    .bind(row.txn_count)
    .bind(generated_at)
    .bind(unique_run_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
