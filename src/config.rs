//! Environment-driven configuration, loaded once at startup.

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,

    pub database_host: String,
    pub database_port: u16,
    pub database_user: String,
    pub database_password: String,
    pub database_name: String,
    pub database_ssl_mode: String,
    pub database_pool_max: u32,
    pub database_pool_min_idle: u32,

    pub job_workers: usize,
    pub job_batch_size: i64,
    pub job_queue_size: usize,

    pub db_retry_attempts: u32,
    pub db_retry_delay_secs: u64,

    pub log_level: String,
    pub log_format: String,

    pub settlement_output_dir: String,
}

impl AppConfig {
    /// Load configuration from the process environment via the `config` crate,
    /// falling back to the documented defaults for anything unset.
    pub fn load() -> Result<Self> {
        let raw = config::Config::builder()
            .set_default("port", 8080)?
            .set_default("database_host", "localhost")?
            .set_default("database_port", 5432)?
            .set_default("database_user", "postgres")?
            .set_default("database_password", "postgres")?
            .set_default("database_name", "orderflow")?
            .set_default("database_ssl_mode", "disable")?
            .set_default("database_pool_max", 20)?
            .set_default("database_pool_min_idle", 2)?
            .set_default("job_workers", 8)?
            .set_default("job_batch_size", 10_000)?
            .set_default("job_queue_size", 100)?
            .set_default("db_retry_attempts", 3)?
            .set_default("db_retry_delay_secs", 5)?
            .set_default("log_level", "info")?
            .set_default("log_format", "json")?
            .set_default("settlement_output_dir", "/tmp/settlements")?
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration")?;

        Ok(Self {
            port: raw.get_int("port")?.try_into().context("PORT out of range")?,
            database_host: raw.get_string("database_host")?,
            database_port: raw
                .get_int("database_port")?
                .try_into()
                .context("DATABASE_PORT out of range")?,
            database_user: raw.get_string("database_user")?,
            database_password: raw.get_string("database_password")?,
            database_name: raw.get_string("database_name")?,
            database_ssl_mode: raw.get_string("database_ssl_mode")?,
            database_pool_max: raw
                .get_int("database_pool_max")?
                .try_into()
                .context("DATABASE_POOL_MAX out of range")?,
            database_pool_min_idle: raw
                .get_int("database_pool_min_idle")?
                .try_into()
                .context("DATABASE_POOL_MIN_IDLE out of range")?,
            job_workers: raw
                .get_int("job_workers")?
                .try_into()
                .context("JOB_WORKERS out of range")?,
            job_batch_size: raw.get_int("job_batch_size")?,
            job_queue_size: raw
                .get_int("job_queue_size")?
                .try_into()
                .context("JOB_QUEUE_SIZE out of range")?,
            db_retry_attempts: raw
                .get_int("db_retry_attempts")?
                .try_into()
                .context("DB_RETRY_ATTEMPTS out of range")?,
            db_retry_delay_secs: raw
                .get_int("db_retry_delay_secs")?
                .try_into()
                .context("DB_RETRY_DELAY_SECS out of range")?,
            log_level: raw.get_string("log_level")?,
            log_format: raw.get_string("log_format")?,
            settlement_output_dir: raw.get_string("settlement_output_dir")?,
        })
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.database_user,
            self.database_password,
            self.database_host,
            self.database_port,
            self.database_name,
            self.database_ssl_mode,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_url_includes_ssl_mode() {
        let cfg = AppConfig {
            port: 8080,
            database_host: "db".to_string(),
            database_port: 5432,
            database_user: "u".to_string(),
            database_password: "p".to_string(),
            database_name: "n".to_string(),
            database_ssl_mode: "require".to_string(),
            database_pool_max: 20,
            database_pool_min_idle: 2,
            job_workers: 8,
            job_batch_size: 10_000,
            job_queue_size: 100,
            db_retry_attempts: 3,
            db_retry_delay_secs: 5,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
            settlement_output_dir: "/tmp/settlements".to_string(),
        };
        assert_eq!(cfg.database_url(), "postgres://u:p@db:5432/n?sslmode=require");
    }
}
