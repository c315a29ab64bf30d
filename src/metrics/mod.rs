//! Metrics for the order-and-settlement backend.
//!
//! Prometheus-compatible exposition via `metrics` + `metrics-exporter-prometheus`,
//! the same stack used throughout this codebase's ancestry.

#![allow(dead_code)]

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

    pub const ORDERS_CREATED_TOTAL: &str = "orders_created_total";
    pub const ORDERS_OUT_OF_STOCK_TOTAL: &str = "order_out_of_stock_total";
    pub const ORDERS_CONCURRENCY_CONFLICT_TOTAL: &str = "order_concurrency_conflict_total";

    pub const SETTLEMENT_JOBS_TOTAL: &str = "settlement_jobs_total";
    pub const SETTLEMENT_JOB_DURATION_SECONDS: &str = "settlement_job_duration_seconds";
    pub const SETTLEMENT_ROWS_TOTAL: &str = "settlement_rows_total";

    pub const JOB_QUEUE_DEPTH: &str = "job_queue_depth";
    pub const JOB_WORKERS_BUSY: &str = "job_workers_busy";
}

pub mod labels {
    pub const METHOD: &str = "method";
    pub const ENDPOINT: &str = "endpoint";
    pub const STATUS: &str = "status";
    pub const OUTCOME: &str = "outcome";
}

/// Install the global Prometheus recorder and return a handle whose
/// `render()` backs the `/metrics` endpoint.
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(names::HTTP_REQUEST_DURATION_SECONDS.to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
        )
        .unwrap()
        .set_buckets_for_metric(
            Matcher::Full(names::SETTLEMENT_JOB_DURATION_SECONDS.to_string()),
            &[0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0],
        )
        .unwrap();

    builder
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    counter!(
        names::HTTP_REQUESTS_TOTAL,
        labels::METHOD => method.to_string(),
        labels::ENDPOINT => endpoint.to_string(),
        labels::STATUS => status_str.clone()
    )
    .increment(1);

    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        labels::METHOD => method.to_string(),
        labels::ENDPOINT => endpoint.to_string(),
        labels::STATUS => status_str
    )
    .record(duration_secs);
}

pub fn record_order_created() {
    counter!(names::ORDERS_CREATED_TOTAL).increment(1);
}

pub fn record_order_out_of_stock() {
    counter!(names::ORDERS_OUT_OF_STOCK_TOTAL).increment(1);
}

pub fn record_order_concurrency_conflict() {
    counter!(names::ORDERS_CONCURRENCY_CONFLICT_TOTAL).increment(1);
}

pub fn record_settlement_job(outcome: &str, duration_secs: f64, rows: usize) {
    counter!(
        names::SETTLEMENT_JOBS_TOTAL,
        labels::OUTCOME => outcome.to_string()
    )
    .increment(1);

    histogram!(names::SETTLEMENT_JOB_DURATION_SECONDS).record(duration_secs);
    counter!(names::SETTLEMENT_ROWS_TOTAL).increment(rows as u64);
}

pub fn set_job_queue_depth(depth: i64) {
    gauge!(names::JOB_QUEUE_DEPTH).set(depth as f64);
}

/// Adjusts the busy-worker gauge by `delta` (positive on pickup, negative on
/// release) rather than setting it, since call sites only know their own
/// transition and not the pool's current total.
pub fn adjust_job_workers_busy(delta: i64) {
    if delta >= 0 {
        gauge!(names::JOB_WORKERS_BUSY).increment(delta as f64);
    } else {
        gauge!(names::JOB_WORKERS_BUSY).decrement((-delta) as f64);
    }
}

/// Timer for measuring durations around a single operation.
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer() {
        let timer = Timer::new();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let elapsed = timer.elapsed_secs();
        assert!(elapsed >= 0.01);
        assert!(elapsed < 0.5);
    }

    #[test]
    fn test_metric_names() {
        assert_eq!(names::HTTP_REQUESTS_TOTAL, "http_requests_total");
        assert_eq!(names::ORDERS_CREATED_TOTAL, "orders_created_total");
        assert_eq!(names::JOB_QUEUE_DEPTH, "job_queue_depth");
    }
}
