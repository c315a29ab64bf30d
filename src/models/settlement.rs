use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-merchant-per-day rollup of COMPLETED transactions.
///
/// Uniqueness: `(merchant_id, date)`. Re-running an overlapping window adds to
/// the stored totals (see settlement_aggregator's upsert) rather than replacing
/// them — additive, not idempotent, by design.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Settlement {
    pub id: i64,
    pub merchant_id: String,
    pub date: NaiveDate,
    pub gross: i64,
    pub fee: i64,
    pub net: i64,
    pub txn_count: i64,
    pub generated_at: DateTime<Utc>,
    pub unique_run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Accumulator row built in-memory while scanning a transaction window, keyed
/// by `"{merchant}_{yyyy-mm-dd}"` during the run and upserted once at the end.
#[derive(Debug, Clone)]
pub struct SettlementRow {
    pub merchant_id: String,
    pub date: NaiveDate,
    pub gross: i64,
    pub fee: i64,
    pub net: i64,
    pub txn_count: i64,
}

impl SettlementRow {
    pub fn new(merchant_id: String, date: NaiveDate) -> Self {
        Self {
            merchant_id,
            date,
            gross: 0,
            fee: 0,
            net: 0,
            txn_count: 0,
        }
    }

    pub fn accumulate(&mut self, amount: i64, fee: i64) {
        self.gross += amount;
        self.fee += fee;
        self.net += amount - fee;
        self.txn_count += 1;
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettlementJobRequest {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_keeps_net_as_gross_minus_fee() {
        let mut row = SettlementRow::new("merchant_1".to_string(), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        row.accumulate(10_000, 300);
        row.accumulate(20_000, 600);
        assert_eq!(row.gross, 30_000);
        assert_eq!(row.fee, 900);
        assert_eq!(row.net, 29_100);
        assert_eq!(row.txn_count, 2);
    }
}
