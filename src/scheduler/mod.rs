pub mod scan;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info};

use scan::ScanService;

/// Runs the watch scan on a cron schedule
pub struct Scheduler {
    inner: JobScheduler,
}

impl Scheduler {
    pub async fn new() -> Result<Self> {
        let inner = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;
        Ok(Self { inner })
    }

    /// Run `service` on every tick of `cron_expr` (six fields, with seconds).
    /// A failed scan is logged and retried on the next tick.
    pub async fn schedule_scan(&self, cron_expr: &str, service: Arc<ScanService>) -> Result<()> {
        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let service = Arc::clone(&service);
            Box::pin(async move {
                match service.run_once().await {
                    Ok(sent) => debug!("Watch scan emitted {} notification(s)", sent),
                    Err(e) => error!("Watch scan failed: {:#}", e),
                }
            })
        })
        .with_context(|| format!("Invalid scan schedule: {}", cron_expr))?;

        self.inner
            .add(job)
            .await
            .context("Failed to add scan job")?;

        info!("Watch scan scheduled with cron: {}", cron_expr);
        Ok(())
    }

    pub async fn start(&self) -> Result<()> {
        self.inner
            .start()
            .await
            .context("Failed to start scheduler")?;
        info!("Scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner
            .shutdown()
            .await
            .context("Failed to shutdown scheduler")?;
        info!("Scheduler stopped");
        Ok(())
    }
}
