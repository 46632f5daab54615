//! Cron-style job scheduler using tokio-cron-scheduler.

use std::sync::Arc;

use quill_core::service::ArticleMutationService;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Every ten minutes, on the minute.
const DEFAULT_SWEEP_CRON: &str = "0 */10 * * * *";

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Enable scheduler.
    pub enabled: bool,
    /// Cron schedule of the idempotency sweep.
    pub sweep_cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_cron: DEFAULT_SWEEP_CRON.to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("SCHEDULER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            sweep_cron: std::env::var("IDEMPOTENCY_SWEEP_CRON")
                .unwrap_or_else(|_| DEFAULT_SWEEP_CRON.to_string()),
        }
    }
}

/// Cron job scheduler wrapper.
pub struct Scheduler {
    inner: JobScheduler,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a new scheduler.
    pub async fn new(config: SchedulerConfig) -> Result<Self, JobSchedulerError> {
        let inner = JobScheduler::new().await?;
        Ok(Self { inner, config })
    }

    /// Add a cron job. Schedules use six fields, seconds first.
    pub async fn add_cron<F, Fut>(
        &self,
        schedule: &str,
        task: F,
    ) -> Result<uuid::Uuid, JobSchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let task = task.clone();
            Box::pin(async move {
                task().await;
            })
        })?;

        let id = self.inner.add(job).await?;
        tracing::info!(schedule = %schedule, job_id = %id, "Cron job registered");
        Ok(id)
    }

    /// Sweep expired idempotency records on the configured schedule.
    ///
    /// Records are already ignored once expired; this only reclaims memory
    /// in stores that do not expire keys on their own.
    pub async fn add_idempotency_sweep(
        &self,
        service: Arc<ArticleMutationService>,
    ) -> Result<uuid::Uuid, JobSchedulerError> {
        let schedule = self.config.sweep_cron.clone();
        self.add_cron(&schedule, move || {
            let service = service.clone();
            async move {
                match service.guard().purge_expired().await {
                    Ok(0) => tracing::debug!("Idempotency sweep found nothing to purge"),
                    Ok(purged) => tracing::info!(purged, "Purged expired idempotency records"),
                    Err(e) => tracing::warn!(error = %e, "Idempotency sweep failed"),
                }
            }
        })
        .await
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        if !self.config.enabled {
            tracing::info!("Scheduler disabled");
            return Ok(());
        }

        self.inner.start().await?;
        tracing::info!("Scheduler started");
        Ok(())
    }

    /// Stop the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.inner.shutdown().await?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}
