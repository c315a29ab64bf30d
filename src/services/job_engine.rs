//! Job Engine: accepts job submissions, runs them on a bounded worker pool,
//! tracks lifecycle and progress, and routes cancellation signals to
//! in-flight jobs.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use sqlx::PgPool;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::db::jobs;
use crate::error::{AppError, NotFoundKind};
use crate::metrics;
use crate::models::job::{Job, JobType};
use crate::models::settlement::SettlementJobRequest;
use crate::services::settlement_aggregator::{JobRunError, SettlementAggregator, SettlementParams};

pub struct JobEngineConfig {
    pub workers: usize,
    pub batch_size: i64,
    pub queue_size: usize,
    pub output_dir: String,
}

/// Shared handle returned to callers (HTTP layer); cheap to clone.
#[derive(Clone)]
pub struct JobEngine {
    inner: Arc<Inner>,
}

struct Inner {
    pool: PgPool,
    sender: mpsc::Sender<Uuid>,
    cancellations: DashMap<Uuid, CancellationToken>,
    shutdown: CancellationToken,
    aggregator: SettlementAggregator,
}

impl JobEngine {
    /// Builds the engine and spawns its `workers` long-lived worker tasks.
    /// Returns the engine handle and a join handle per worker so the caller
    /// can await them during shutdown.
    pub fn start(pool: PgPool, config: JobEngineConfig) -> (Self, Vec<tokio::task::JoinHandle<()>>) {
        let (sender, receiver) = mpsc::channel::<Uuid>(config.queue_size);
        let receiver = Arc::new(Mutex::new(receiver));

        let aggregator = SettlementAggregator::new(pool.clone(), config.output_dir.clone(), config.batch_size);

        let inner = Arc::new(Inner {
            pool,
            sender,
            cancellations: DashMap::new(),
            shutdown: CancellationToken::new(),
            aggregator,
        });

        let engine = Self { inner };

        let mut handles = Vec::with_capacity(config.workers);
        for worker_id in 0..config.workers {
            let engine = engine.clone();
            let receiver = receiver.clone();
            handles.push(tokio::spawn(async move {
                engine.run_worker(worker_id, receiver).await;
            }));
        }

        (engine, handles)
    }

    /// Writes the job row in QUEUED, then non-blockingly enqueues its id.
    /// Never blocks the caller: a full queue fails fast with `QueueFull`.
    pub async fn submit_settlement(&self, req: SettlementJobRequest) -> Result<Job, AppError> {
        if self.inner.shutdown.is_cancelled() {
            return Err(AppError::ServiceUnavailable("job engine is shutting down".to_string()));
        }
        if req.to < req.from {
            return Err(AppError::Validation("to must not be before from".to_string()));
        }

        let parameters = serde_json::json!({ "from": req.from, "to": req.to });
        let job = jobs::create(&self.inner.pool, JobType::Settlement, parameters).await?;

        match self.inner.sender.try_send(job.id) {
            Ok(()) => {
                self.record_queue_depth();
                Ok(job)
            }
            Err(_) => {
                jobs::mark_failed(&self.inner.pool, job.id, "submission queue is full").await.ok();
                Err(AppError::QueueFull)
            }
        }
    }

    /// Backlog depth is derived from the channel's own accounting rather
    /// than tracked separately, so it stays correct on both enqueue and
    /// dequeue without a second counter to keep in sync.
    fn record_queue_depth(&self) {
        let depth = self.inner.sender.max_capacity() as i64 - self.inner.sender.capacity() as i64;
        metrics::set_job_queue_depth(depth);
    }

    pub async fn get_job(&self, id: Uuid) -> Result<Job, AppError> {
        jobs::find(&self.inner.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(NotFoundKind::Job, format!("job {id} not found")))
    }

    /// Conditional status update: QUEUED|RUNNING -> CANCELLED. If a
    /// cancellation handle is registered for this job, trigger it so the
    /// aggregator observes it at its next suspension point.
    pub async fn cancel(&self, id: Uuid) -> Result<(), AppError> {
        let flipped = jobs::cancel(&self.inner.pool, id).await?;
        if let Some(token) = self.inner.cancellations.get(&id) {
            token.cancel();
        }
        if flipped {
            Ok(())
        } else {
            // Either already terminal, or the id never existed — both
            // surface the same way to the caller.
            let exists = jobs::find(&self.inner.pool, id).await?.is_some();
            if exists {
                Err(AppError::JobAlreadyCancelled(id))
            } else {
                Err(AppError::NotFound(NotFoundKind::Job, format!("job {id} not found")))
            }
        }
    }

    /// Stop accepting new submissions, let in-flight jobs observe
    /// cancellation and exit, and leave queued-but-unstarted jobs QUEUED in
    /// storage for the next process to pick up manually (no persistent
    /// retake on boot in this design).
    pub async fn shutdown(self, workers: Vec<tokio::task::JoinHandle<()>>) {
        self.inner.shutdown.cancel();
        for token in self.inner.cancellations.iter() {
            token.cancel();
        }
        for handle in workers {
            let _ = handle.await;
        }
    }

    async fn run_worker(&self, worker_id: usize, receiver: Arc<Mutex<mpsc::Receiver<Uuid>>>) {
        loop {
            let job_id = {
                let mut rx = receiver.lock().await;
                tokio::select! {
                    _ = self.inner.shutdown.cancelled() => None,
                    job_id = rx.recv() => job_id,
                }
            };

            let Some(job_id) = job_id else {
                tracing::info!(worker_id, "worker shutting down");
                return;
            };

            self.record_queue_depth();
            self.process_job(worker_id, job_id).await;
        }
    }

    async fn process_job(&self, worker_id: usize, job_id: Uuid) {
        let token = CancellationToken::new();
        self.inner.cancellations.insert(job_id, token.clone());
        metrics::adjust_job_workers_busy(1);

        let start = Instant::now();
        let outcome = self.run_job(job_id, &token).await;

        self.inner.cancellations.remove(&job_id);
        metrics::adjust_job_workers_busy(-1);

        let duration = start.elapsed().as_secs_f64();
        match &outcome {
            Ok(rows) => {
                metrics::record_settlement_job("completed", duration, *rows);
                tracing::info!(worker_id, job_id = %job_id, duration, rows, "job completed");
            }
            Err(JobRunError::Cancelled) => {
                metrics::record_settlement_job("cancelled", duration, 0);
                tracing::info!(worker_id, job_id = %job_id, duration, "job cancelled");
            }
            Err(err) => {
                metrics::record_settlement_job("failed", duration, 0);
                tracing::error!(worker_id, job_id = %job_id, error = %err, "job failed");
            }
        }
    }

    async fn run_job(&self, job_id: Uuid, token: &CancellationToken) -> Result<usize, JobRunError> {
        jobs::mark_running(&self.inner.pool, job_id).await?;

        let job = jobs::find(&self.inner.pool, job_id)
            .await?
            .ok_or_else(|| JobRunError::Validation(format!("job {job_id} vanished mid-run")))?;

        let result = match job.job_type {
            JobType::Settlement => self.run_settlement(job_id, &job, token).await,
        };

        match result {
            Ok(summary) => {
                jobs::mark_completed(
                    &self.inner.pool,
                    job_id,
                    summary.result_path.to_string_lossy().as_ref(),
                    &summary.download_url,
                )
                .await?;
                Ok(summary.rows)
            }
            Err(JobRunError::Cancelled) => {
                jobs::mark_cancelled(&self.inner.pool, job_id).await.ok();
                Err(JobRunError::Cancelled)
            }
            Err(err) => {
                jobs::mark_failed(&self.inner.pool, job_id, &err.to_string()).await.ok();
                Err(err)
            }
        }
    }

    async fn run_settlement(
        &self,
        job_id: Uuid,
        job: &Job,
        token: &CancellationToken,
    ) -> Result<crate::services::settlement_aggregator::SettlementSummary, JobRunError> {
        let params: SettlementJobRequest = serde_json::from_value(job.parameters.clone())
            .map_err(|e| JobRunError::Validation(format!("malformed job parameters: {e}")))?;

        self.inner
            .aggregator
            .run(
                job_id,
                SettlementParams {
                    from: params.from,
                    to: params.to,
                },
                token.clone(),
            )
            .await
    }
}

