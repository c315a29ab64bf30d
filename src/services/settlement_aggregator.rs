//! Settlement Aggregator: scans COMPLETED transactions in a date window,
//! rolls them up per `(merchant, date)`, persists the rollups via an
//! additive upsert, and streams a CSV report to the filesystem.
//!
//! A bounded fan-out across accumulator workers only pays for itself by
//! overlapping in-memory aggregation with the next page fetch, not by adding
//! raw throughput — the aggregation itself is cheap next to the I/O. A
//! single-threaded inner loop gets the same result with far less machinery,
//! so that's what this does.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::db::{jobs, settlements, transactions};
use crate::models::settlement::SettlementRow;

#[derive(Debug, thiserror::Error)]
pub enum JobRunError {
    #[error("{0}")]
    Validation(String),

    #[error("run cancelled")]
    Cancelled,

    #[error("{0}")]
    Storage(#[from] sqlx::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Csv(#[from] csv::Error),
}

pub struct SettlementParams {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

pub struct SettlementSummary {
    pub rows: usize,
    pub result_path: PathBuf,
    pub download_url: String,
}

pub struct SettlementAggregator {
    pool: PgPool,
    output_dir: PathBuf,
    batch_size: i64,
}

impl SettlementAggregator {
    pub fn new(pool: PgPool, output_dir: impl Into<PathBuf>, batch_size: i64) -> Self {
        Self {
            pool,
            output_dir: output_dir.into(),
            batch_size,
        }
    }

    /// Stored window is the half-open `[from_midnight, to_midnight + 1 day)`.
    fn window(params: &SettlementParams) -> Result<(DateTime<Utc>, DateTime<Utc>), JobRunError> {
        if params.to < params.from {
            return Err(JobRunError::Validation("to must not be before from".to_string()));
        }
        let from = params
            .from
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time")
            .and_utc();
        let to = (params.to + chrono::Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time")
            .and_utc();
        Ok((from, to))
    }

    fn key(merchant_id: &str, date: NaiveDate) -> String {
        format!("{merchant_id}_{date}")
    }

    async fn cancelled(&self, job_id: Uuid, token: &CancellationToken) -> Result<bool, sqlx::Error> {
        if token.is_cancelled() {
            return Ok(true);
        }
        jobs::is_cancelled(&self.pool, job_id).await
    }

    /// Runs a single settlement job end to end. `job_id` is used only to
    /// report progress and poll cancellation, and to name the output file.
    pub async fn run(
        &self,
        job_id: Uuid,
        params: SettlementParams,
        token: CancellationToken,
    ) -> Result<SettlementSummary, JobRunError> {
        let (from, to) = Self::window(&params)?;

        let total = transactions::count(&self.pool, from, to).await?;
        jobs::update_progress(&self.pool, job_id, 0, total, 0.0).await?;

        let mut map: BTreeMap<String, SettlementRow> = BTreeMap::new();
        let mut offset: i64 = 0;
        let mut processed: i64 = 0;

        loop {
            if self.cancelled(job_id, &token).await? {
                return Err(JobRunError::Cancelled);
            }

            let batch = transactions::page(&self.pool, from, to, offset, self.batch_size).await?;
            if batch.is_empty() {
                break;
            }

            for txn in &batch {
                let date = txn.paid_at.date_naive();
                let key = Self::key(&txn.merchant_id, date);
                let row = map
                    .entry(key)
                    .or_insert_with(|| SettlementRow::new(txn.merchant_id.clone(), date));
                row.accumulate(txn.amount, txn.fee);
            }

            processed += batch.len() as i64;
            let progress = if total > 0 {
                (processed as f64 / total as f64) * 100.0
            } else {
                100.0
            };
            jobs::update_progress(&self.pool, job_id, processed, total, progress).await?;

            if self.cancelled(job_id, &token).await? {
                return Err(JobRunError::Cancelled);
            }

            offset += self.batch_size;
        }

        let unique_run_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;
        for row in map.values() {
            settlements::upsert(&mut tx, row, unique_run_id).await?;
        }
        tx.commit().await?;

        let result_path = self.write_csv(job_id, &map, unique_run_id).await?;
        let download_url = format!("/downloads/{job_id}.csv");

        Ok(SettlementSummary {
            rows: map.len(),
            result_path,
            download_url,
        })
    }

    async fn write_csv(
        &self,
        job_id: Uuid,
        map: &BTreeMap<String, SettlementRow>,
        unique_run_id: Uuid,
    ) -> Result<PathBuf, JobRunError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(format!("{job_id}.csv"));
        let generated_at = Utc::now().to_rfc3339();

        // BTreeMap iterates in key order ("{merchant}_{yyyy-mm-dd}"), which
        // sorts by merchant then date since the date is zero-padded ISO-8601.
        let mut rows: Vec<&SettlementRow> = map.values().collect();
        rows.sort_by(|a, b| (&a.merchant_id, a.date).cmp(&(&b.merchant_id, b.date)));

        let path_for_write = path.clone();
        let generated_at_for_write = generated_at.clone();
        let rows_owned: Vec<SettlementRow> = rows.into_iter().cloned().collect();

        tokio::task::spawn_blocking(move || -> Result<(), JobRunError> {
            let mut writer = csv::WriterBuilder::new()
                .terminator(csv::Terminator::Any(b'\n'))
                .from_path(&path_for_write)?;
            writer.write_record([
                "merchant_id",
                "date",
                "gross_cents",
                "fee_cents",
                "net_cents",
                "transaction_count",
                "generated_at",
                "unique_run_id",
            ])?;
            for row in &rows_owned {
                writer.write_record([
                    row.merchant_id.clone(),
                    row.date.to_string(),
                    row.gross.to_string(),
                    row.fee.to_string(),
                    row.net.to_string(),
                    row.txn_count.to_string(),
                    generated_at_for_write.clone(),
                    unique_run_id.to_string(),
                ])?;
            }
            writer.flush()?;
            Ok(())
        })
        .await
        .expect("csv write task panicked")?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_rejects_inverted_range() {
        let params = SettlementParams {
            from: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        };
        assert!(matches!(
            SettlementAggregator::window(&params),
            Err(JobRunError::Validation(_))
        ));
    }

    #[test]
    fn window_is_half_open_on_the_upper_bound() {
        let params = SettlementParams {
            from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        };
        let (from, to) = SettlementAggregator::window(&params).unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap().and_utc());
        assert_eq!(to, NaiveDate::from_ymd_opt(2026, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap().and_utc());
    }

    #[test]
    fn key_combines_merchant_and_iso_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        assert_eq!(SettlementAggregator::key("merchant_1", date), "merchant_1_2026-03-04");
    }

}
