use std::collections::BTreeMap;

use tracing::info;

use crate::errors::AppError;
use crate::models::{CompiledSchedule, JobName, JobSchedule, ScheduledTask};
use crate::store::ScheduledTaskStore;

/// In-memory view of the persisted job schedules.
///
/// Loaded once at startup and read-only afterwards. Edits to the stored
/// schedules take effect on the next restart.
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfigService {
    schedules: BTreeMap<JobName, JobSchedule>,
}

impl SchedulerConfigService {
    pub async fn load(store: &dyn ScheduledTaskStore) -> Result<Self, AppError> {
        info!("⚙️  Loading scheduler cron expressions...");
        let tasks = store.find_all().await?;
        Ok(Self::from_tasks(&tasks))
    }

    pub fn from_tasks(tasks: &[ScheduledTask]) -> Self {
        let mut schedules = BTreeMap::new();
        for task in tasks {
            info!(
                "⚙️  {} -> [cron: {}] [zone: {}]",
                task.job_name, task.cron_expression, task.time_zone
            );
            schedules.insert(task.job_name, task.schedule());
        }
        Self { schedules }
    }

    /// Cron expression and time zone for `job_name`.
    pub fn resolve(&self, job_name: JobName) -> Result<&JobSchedule, AppError> {
        self.schedules.get(&job_name).ok_or_else(|| {
            AppError::Configuration(format!("No schedule configured for {}", job_name))
        })
    }

    pub fn cron_expression(&self, job_name: JobName) -> Result<&str, AppError> {
        Ok(self.resolve(job_name)?.cron_expression.as_str())
    }

    pub fn time_zone(&self, job_name: JobName) -> Result<&str, AppError> {
        Ok(self.resolve(job_name)?.time_zone.as_str())
    }

    /// Resolve and parse the schedule for `job_name`.
    pub fn compile(&self, job_name: JobName) -> Result<CompiledSchedule, AppError> {
        CompiledSchedule::compile(job_name, self.resolve(job_name)?)
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }
}
