use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// A payment transaction. Settlement consumes only COMPLETED rows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: i64,
    pub merchant_id: String,
    /// minor currency units
    pub amount: i64,
    /// minor currency units
    pub fee: i64,
    pub status: TransactionStatus,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
