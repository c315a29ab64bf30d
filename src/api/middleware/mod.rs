//! API Middleware: HTTP metrics recording and request-id stamping.

pub mod metrics;
pub mod request_id;

pub use metrics::metrics_middleware;
pub use request_id::MakeRequestUuid;
