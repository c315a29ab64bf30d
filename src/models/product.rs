use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A sellable product with a finite, version-guarded stock count.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub stock: i64,
    /// unit price in minor currency units (cents)
    pub price: i64,
    /// optimistic concurrency token, bumped on every stock mutation
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot of a product returned alongside an order, trimmed to public fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: i64,
    pub name: String,
    pub price: i64,
}

impl From<Product> for ProductSnapshot {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            price: p.price,
        }
    }
}

/// Outcome of a conditional stock decrement, decided from `rows_affected` plus
/// a disambiguating read when zero rows were touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecrementOutcome {
    Ok,
    OutOfStock,
    ConcurrencyConflict,
}
