use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info};

use crate::errors::AppError;
use crate::external::collaborators::{ApplicationControl, Notifier, PortfolioOperations};
use crate::jobs;
use crate::models::{CompiledSchedule, JobName};
use crate::services::ipo_cache_service::IpoCacheService;
use crate::services::nav_cache_service::NavCacheService;
use crate::services::scheduler_config_service::SchedulerConfigService;
use crate::services::task_execution_service::{ExecutionOutcome, TaskExecutionService};
use crate::store::ScheduledTaskStore;

// Context passed to job functions
#[derive(Clone)]
pub struct JobContext {
    pub tasks: Arc<dyn ScheduledTaskStore>,
    pub ipo_cache: Arc<IpoCacheService>,
    pub nav_cache: Arc<NavCacheService>,
    pub portfolio: Arc<dyn PortfolioOperations>,
    pub notifier: Arc<dyn Notifier>,
    pub app_control: Arc<dyn ApplicationControl>,
    /// Zone used to decide what "today" means for user notifications.
    pub notification_tz: Tz,
}

/// Which jobs made it onto the timer and which did not.
#[derive(Debug, Default)]
pub struct RegistrationReport {
    pub registered: Vec<JobName>,
    pub rejected: Vec<(JobName, String)>,
}

impl RegistrationReport {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Installs one recurring trigger per known job and routes every fire
/// through the execution wrapper.
pub struct JobSchedulerService {
    scheduler: JobScheduler,
    config: Arc<SchedulerConfigService>,
    executor: Arc<TaskExecutionService>,
    context: JobContext,
}

impl JobSchedulerService {
    pub async fn new(
        config: Arc<SchedulerConfigService>,
        executor: Arc<TaskExecutionService>,
        context: JobContext,
    ) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::External(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            config,
            executor,
            context,
        })
    }

    /// Register every job with a resolvable schedule and start the timer.
    ///
    /// A job whose schedule is missing or invalid is logged and left out;
    /// the remaining jobs are still installed.
    pub async fn start(&mut self) -> Result<RegistrationReport, AppError> {
        info!("🚀 Starting job scheduler...");
        let mut report = RegistrationReport::default();

        for job_name in JobName::ALL {
            let installed = match self.config.compile(job_name) {
                Ok(compiled) => self.schedule_job(&compiled).await,
                Err(e) => Err(e),
            };

            match installed {
                Ok(()) => report.registered.push(job_name),
                Err(e) => {
                    error!(job = %job_name, "❌ Not scheduling {}: {}", job_name, e);
                    report.rejected.push((job_name, e.to_string()));
                }
            }
        }

        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::External(format!("Failed to start scheduler: {}", e)))?;

        info!(
            "✅ Job scheduler started ({} scheduled, {} rejected)",
            report.registered.len(),
            report.rejected.len()
        );
        Ok(report)
    }

    pub async fn stop(&mut self) -> Result<(), AppError> {
        info!("🛑 Stopping job scheduler...");
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::External(format!("Failed to stop scheduler: {}", e)))?;
        info!("✅ Job scheduler stopped");
        Ok(())
    }

    /// Run a job immediately, outside its timer.
    pub async fn fire(&self, job_name: JobName) -> ExecutionOutcome {
        jobs::execute_tracked(&self.executor, &self.context, job_name).await
    }

    async fn schedule_job(&mut self, compiled: &CompiledSchedule) -> Result<(), AppError> {
        let job_name = compiled.job_name;
        let executor = self.executor.clone();
        let context = self.context.clone();

        let job = Job::new_async_tz(
            compiled.expression.as_str(),
            compiled.time_zone,
            move |_uuid, _l| {
                let executor = executor.clone();
                let context = context.clone();
                Box::pin(async move {
                    let outcome = jobs::execute_tracked(&executor, &context, job_name).await;
                    debug!(job = %job_name, "Fire finished: {:?}", outcome);
                })
            },
        )
        .map_err(|e| {
            AppError::Configuration(format!("Failed to create job {}: {}", job_name, e))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::External(format!("Failed to add job {}: {}", job_name, e)))?;

        match compiled.next_fire_after(Utc::now()) {
            Some(next) => info!(
                "📅 Scheduled: {} [cron: {}] [zone: {}] next at {}",
                job_name, compiled.expression, compiled.time_zone, next
            ),
            None => info!(
                "📅 Scheduled: {} [cron: {}] [zone: {}] with no upcoming fire",
                job_name, compiled.expression, compiled.time_zone
            ),
        }
        Ok(())
    }
}
