use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use tracing::info;

use crate::errors::AppError;
use crate::jobs;
use crate::models::{JobName, ScheduledTask, StatusChange};
use crate::services::job_scheduler_service::JobContext;
use crate::services::scheduler_config_service::SchedulerConfigService;
use crate::services::task_execution_service::{ExecutionOutcome, TaskExecutionService};
use crate::store::ScheduledTaskStore;

/// Operator-facing view of the scheduled jobs.
pub struct SchedulerAdminService {
    store: Arc<dyn ScheduledTaskStore>,
    config: Arc<SchedulerConfigService>,
    executor: Arc<TaskExecutionService>,
    context: JobContext,
}

impl SchedulerAdminService {
    pub fn new(
        store: Arc<dyn ScheduledTaskStore>,
        config: Arc<SchedulerConfigService>,
        executor: Arc<TaskExecutionService>,
        context: JobContext,
    ) -> Self {
        Self {
            store,
            config,
            executor,
            context,
        }
    }

    pub async fn list_tasks(&self) -> Result<Vec<ScheduledTask>, AppError> {
        self.store.find_all().await
    }

    /// Look a task up by numeric id, or by job name when the key is not a number.
    pub async fn get_task(&self, id_or_name: &str) -> Result<ScheduledTask, AppError> {
        let key = id_or_name.trim();
        if key.is_empty() {
            return Err(AppError::Validation("Task id or name must not be empty".to_string()));
        }

        let found = match key.parse::<i64>() {
            Ok(id) => self.store.find_by_id(id).await?,
            Err(_) => {
                let job_name: JobName = key.parse().map_err(AppError::NotFound)?;
                self.store.find_by_name(job_name).await?
            }
        };

        found.ok_or_else(|| AppError::NotFound(format!("Scheduled task {} not found", key)))
    }

    /// Run a job now, through the same wrapper as its timer.
    pub async fn execute_task(&self, id_or_name: &str) -> Result<ExecutionOutcome, AppError> {
        let task = self.get_task(id_or_name).await?;
        info!(job = %task.job_name, "▶️  Manual run of {} requested", task.job_name);
        Ok(jobs::execute_tracked(&self.executor, &self.context, task.job_name).await)
    }

    pub async fn update_task_status(
        &self,
        id_or_name: &str,
        change: StatusChange,
    ) -> Result<ScheduledTask, AppError> {
        let mut task = self.get_task(id_or_name).await?;
        task.is_active = matches!(change, StatusChange::Activate);
        self.store.set_active(task.job_name, task.is_active).await?;

        info!(
            job = %task.job_name,
            "🔧 {} is now {}",
            task.job_name,
            if task.is_active { "active" } else { "inactive" }
        );
        Ok(task)
    }

    /// Next time the job's timer will fire, from the schedule loaded at startup.
    pub fn next_fire_time(&self, job_name: JobName) -> Result<Option<chrono::DateTime<Tz>>, AppError> {
        let compiled = self.config.compile(job_name)?;
        Ok(compiled.next_fire_after(Utc::now()))
    }
}
