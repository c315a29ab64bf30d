use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware as axum_middleware;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_http::ServiceBuilderExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod db;
mod error;
mod metrics;
mod models;
mod services;

use crate::api::middleware::{metrics_middleware, MakeRequestUuid};
use crate::config::AppConfig;
use crate::db::Database;
use crate::services::job_engine::{JobEngine, JobEngineConfig};
use crate::services::order_allocator::OrderAllocator;

pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub order_allocator: OrderAllocator,
    pub job_engine: JobEngine,
    pub metrics_handle: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;

    init_tracing(&config);
    let metrics_handle = metrics::init_metrics();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting orderflow-backend");

    let db = Database::connect(&config).await?;
    tracing::info!("database connected");

    // TODO: sweep `jobs` for rows still RUNNING from a prior process's crash
    // and mark them FAILED before accepting new submissions. Not yet done —
    // a crash mid-job currently leaves its row RUNNING forever.
    let order_allocator = OrderAllocator::new(db.clone());

    let (job_engine, worker_handles) = JobEngine::start(
        db.pool.clone(),
        JobEngineConfig {
            workers: config.job_workers,
            batch_size: config.job_batch_size,
            queue_size: config.job_queue_size,
            output_dir: config.settlement_output_dir.clone(),
        },
    );
    tracing::info!(workers = config.job_workers, "job engine started");

    let job_engine_for_shutdown = job_engine.clone();
    let port = config.port;
    let state = Arc::new(AppState {
        config,
        db,
        order_allocator,
        job_engine,
        metrics_handle,
    });

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down job engine");
    job_engine_for_shutdown.shutdown(worker_handles).await;

    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let service = tower::ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(TraceLayer::new_for_http())
        .propagate_x_request_id()
        .layer(CatchPanicLayer::new())
        .layer(axum_middleware::from_fn(metrics_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    api::routes::create_router(state).layer(service)
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("orderflow_backend={}, tower_http=info", config.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);

    if config.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
