//! Persistence Gateway: typed access to `products`, `orders`, `transactions`,
//! `settlements`, `jobs`, plus a scoped transaction primitive.

pub mod jobs;
pub mod orders;
pub mod products;
pub mod settlements;
pub mod transactions;

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    /// Connect with a bounded number of retries against the documented
    /// `db_retry_attempts` / `db_retry_delay_secs` config. Retries apply only
    /// to the initial connection attempt — in-flight statement errors are
    /// never retried at this layer.
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let url = config.database_url();
        let mut attempts_left = config.db_retry_attempts.max(1);

        loop {
            let result = PgPoolOptions::new()
                .max_connections(config.database_pool_max)
                .min_connections(config.database_pool_min_idle)
                .connect(&url)
                .await;

            match result {
                Ok(pool) => return Ok(Self { pool }),
                Err(err) if attempts_left > 1 => {
                    attempts_left -= 1;
                    warn!(
                        error = %err,
                        attempts_left,
                        "database connection failed, retrying in {}s",
                        config.db_retry_delay_secs
                    );
                    tokio::time::sleep(Duration::from_secs(config.db_retry_delay_secs)).await;
                }
                Err(err) => {
                    error!(error = %err, "database connection failed, giving up");
                    return Err(err.into());
                }
            }
        }
    }

    /// Storage reachability probe used by `/health`, bounded to 5 seconds.
    pub async fn health_check(&self) -> bool {
        let probe = sqlx::query("SELECT 1").execute(&self.pool);
        match tokio::time::timeout(Duration::from_secs(5), probe).await {
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                warn!(error = %err, "health check query failed");
                false
            }
            Err(_) => {
                warn!("health check timed out after 5s");
                false
            }
        }
    }

    /// Begin a storage transaction, run `scope`, commit on success. `scope`
    /// hands the transaction back on success so it can be committed here; on
    /// failure it simply drops the transaction, which sqlx rolls back for us
    /// (this is also what happens if `scope` panics).
    pub async fn with_transaction<'a, T, E, F, Fut>(&'a self, scope: F) -> Result<T, E>
    where
        E: From<sqlx::Error>,
        F: FnOnce(sqlx::Transaction<'a, sqlx::Postgres>) -> Fut,
        Fut: std::future::Future<Output = Result<(T, sqlx::Transaction<'a, sqlx::Postgres>), E>>,
    {
        let tx = self.pool.begin().await?;
        match scope(tx).await {
            Ok((value, tx)) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                info!("transaction rolled back");
                Err(err)
            }
        }
    }
}
