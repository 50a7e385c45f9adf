use std::sync::Arc;

use crate::errors::AppError;
use crate::services::job_scheduler_service::{JobContext, JobSchedulerService};
use crate::services::scheduler_admin_service::SchedulerAdminService;
use crate::services::scheduler_config_service::SchedulerConfigService;
use crate::services::task_execution_service::TaskExecutionService;
use crate::store::ScheduledTaskStore;

/// Shared services of a running process.
#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<dyn ScheduledTaskStore>,
    pub schedules: Arc<SchedulerConfigService>,
    pub executor: Arc<TaskExecutionService>,
    pub jobs: JobContext,
    pub admin: Arc<SchedulerAdminService>,
}

impl AppState {
    /// Load the persisted schedules and assemble the services around them.
    pub async fn load(tasks: Arc<dyn ScheduledTaskStore>, jobs: JobContext) -> Result<Self, AppError> {
        let schedules = Arc::new(SchedulerConfigService::load(tasks.as_ref()).await?);
        let executor = Arc::new(TaskExecutionService::new(tasks.clone()));
        let admin = Arc::new(SchedulerAdminService::new(
            tasks.clone(),
            schedules.clone(),
            executor.clone(),
            jobs.clone(),
        ));

        Ok(Self {
            tasks,
            schedules,
            executor,
            jobs,
            admin,
        })
    }

    pub async fn scheduler(&self) -> Result<JobSchedulerService, AppError> {
        JobSchedulerService::new(self.schedules.clone(), self.executor.clone(), self.jobs.clone()).await
    }
}
