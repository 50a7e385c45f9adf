use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use sqlx::PgPool;

use crate::db::scheduled_task_queries;
use crate::errors::AppError;
use crate::models::{ExecutionUpdate, JobName, ScheduledTask, TaskStatus};

/// Persistence for schedules and execution records, keyed by job name.
///
/// The execution wrapper only writes lifecycle columns and the admin surface
/// only writes `is_active`, so neither can undo the other's change.
#[async_trait]
pub trait ScheduledTaskStore: Send + Sync {
    async fn find_by_name(&self, job_name: JobName) -> Result<Option<ScheduledTask>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<ScheduledTask>, AppError>;

    /// Ordered by job name.
    async fn find_all(&self) -> Result<Vec<ScheduledTask>, AppError>;

    /// Insert or fully replace a record. Seeding only.
    async fn save(&self, task: &ScheduledTask) -> Result<(), AppError>;

    /// Overwrite status, dates, times and error of an existing record.
    async fn update_execution(
        &self,
        job_name: JobName,
        update: &ExecutionUpdate,
    ) -> Result<(), AppError>;

    async fn set_active(&self, job_name: JobName, active: bool) -> Result<(), AppError>;
}

fn not_found(job_name: JobName) -> AppError {
    AppError::NotFound(format!("Scheduled task {} not found", job_name))
}

// ==============================================================================
// Postgres
// ==============================================================================

pub struct PgScheduledTaskStore {
    pool: PgPool,
}

impl PgScheduledTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduledTaskStore for PgScheduledTaskStore {
    async fn find_by_name(&self, job_name: JobName) -> Result<Option<ScheduledTask>, AppError> {
        Ok(scheduled_task_queries::find_by_name(&self.pool, job_name).await?)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ScheduledTask>, AppError> {
        Ok(scheduled_task_queries::find_by_id(&self.pool, id).await?)
    }

    async fn find_all(&self) -> Result<Vec<ScheduledTask>, AppError> {
        Ok(scheduled_task_queries::find_all(&self.pool).await?)
    }

    async fn save(&self, task: &ScheduledTask) -> Result<(), AppError> {
        scheduled_task_queries::upsert(&self.pool, task).await?;
        Ok(())
    }

    async fn update_execution(
        &self,
        job_name: JobName,
        update: &ExecutionUpdate,
    ) -> Result<(), AppError> {
        match scheduled_task_queries::update_execution(&self.pool, job_name, update).await? {
            0 => Err(not_found(job_name)),
            _ => Ok(()),
        }
    }

    async fn set_active(&self, job_name: JobName, active: bool) -> Result<(), AppError> {
        match scheduled_task_queries::set_active(&self.pool, job_name, active).await? {
            0 => Err(not_found(job_name)),
            _ => Ok(()),
        }
    }
}

// ==============================================================================
// In-memory
// ==============================================================================

/// Oldest entries are dropped past this many status writes.
pub const STATUS_HISTORY_CAPACITY: usize = 256;

/// Store backed by a concurrent map, for tests and local runs without Postgres.
///
/// The statuses written by `save` and `update_execution` are kept in a
/// bounded log so the transitions of a job can be inspected. Writes can be
/// made to fail on demand.
#[derive(Clone, Default)]
pub struct InMemoryScheduledTaskStore {
    tasks: Arc<DashMap<JobName, ScheduledTask>>,
    status_log: Arc<Mutex<VecDeque<(JobName, Option<TaskStatus>)>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryScheduledTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: impl IntoIterator<Item = ScheduledTask>) -> Self {
        let store = Self::new();
        for task in tasks {
            store.tasks.insert(task.job_name, task);
        }
        store
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn get(&self, job_name: JobName) -> Option<ScheduledTask> {
        self.tasks.get(&job_name).map(|t| t.value().clone())
    }

    /// Statuses written for `job_name`, oldest first.
    pub fn status_history(&self, job_name: JobName) -> Vec<Option<TaskStatus>> {
        self.status_log
            .lock()
            .iter()
            .filter(|(job, _)| *job == job_name)
            .map(|(_, status)| *status)
            .collect()
    }

    pub fn clear_history(&self) {
        self.status_log.lock().clear();
    }

    fn check_writable(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Db(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn record_status(&self, job_name: JobName, status: Option<TaskStatus>) {
        let mut log = self.status_log.lock();
        if log.len() == STATUS_HISTORY_CAPACITY {
            log.pop_front();
        }
        log.push_back((job_name, status));
    }
}

#[async_trait]
impl ScheduledTaskStore for InMemoryScheduledTaskStore {
    async fn find_by_name(&self, job_name: JobName) -> Result<Option<ScheduledTask>, AppError> {
        Ok(self.get(job_name))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ScheduledTask>, AppError> {
        Ok(self
            .tasks
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| entry.value().clone()))
    }

    async fn find_all(&self) -> Result<Vec<ScheduledTask>, AppError> {
        let mut tasks: Vec<ScheduledTask> =
            self.tasks.iter().map(|entry| entry.value().clone()).collect();
        tasks.sort_by_key(|t| t.job_name.as_str());
        Ok(tasks)
    }

    async fn save(&self, task: &ScheduledTask) -> Result<(), AppError> {
        self.check_writable()?;
        self.tasks.insert(task.job_name, task.clone());
        self.record_status(task.job_name, task.status);
        Ok(())
    }

    async fn update_execution(
        &self,
        job_name: JobName,
        update: &ExecutionUpdate,
    ) -> Result<(), AppError> {
        self.check_writable()?;
        let mut task = self.tasks.get_mut(&job_name).ok_or_else(|| not_found(job_name))?;
        task.apply_execution(update);
        // Release the shard lock before touching the log
        drop(task);
        self.record_status(job_name, update.status);
        Ok(())
    }

    async fn set_active(&self, job_name: JobName, active: bool) -> Result<(), AppError> {
        self.check_writable()?;
        let mut task = self.tasks.get_mut(&job_name).ok_or_else(|| not_found(job_name))?;
        task.is_active = active;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_all_is_ordered_by_name() {
        let store = InMemoryScheduledTaskStore::with_tasks(vec![
            ScheduledTask::new(2, JobName::WeeklyPfReport, "0 0 9 * * SAT", "UTC"),
            ScheduledTask::new(1, JobName::CaptureAccountSnapshot, "0 0 18 * * *", "UTC"),
            ScheduledTask::new(3, JobName::RetrieveIpoDetails, "0 0 7 * * *", "UTC"),
        ]);

        let names: Vec<JobName> = store
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.job_name)
            .collect();

        assert_eq!(
            names,
            vec![
                JobName::CaptureAccountSnapshot,
                JobName::RetrieveIpoDetails,
                JobName::WeeklyPfReport
            ]
        );
    }

    #[tokio::test]
    async fn test_save_records_history_and_can_fail() {
        let store = InMemoryScheduledTaskStore::with_tasks(vec![ScheduledTask::new(
            7,
            JobName::ReloadWatchlist,
            "0 0 8 * * *",
            "UTC",
        )]);
        let mut task = store.find_by_id(7).await.unwrap().unwrap();

        task.status = Some(TaskStatus::InProgress);
        store.save(&task).await.unwrap();

        store.set_fail_writes(true);
        task.status = Some(TaskStatus::Completed);
        assert!(store.save(&task).await.is_err());

        assert_eq!(
            store.status_history(JobName::ReloadWatchlist),
            vec![Some(TaskStatus::InProgress)]
        );
        assert_eq!(
            store.get(JobName::ReloadWatchlist).unwrap().status,
            Some(TaskStatus::InProgress)
        );
    }

    #[tokio::test]
    async fn test_partial_updates_leave_other_columns_alone() {
        let store = InMemoryScheduledTaskStore::with_tasks(vec![ScheduledTask::new(
            3,
            JobName::UpdateMfNavCache,
            "0 30 22 * * *",
            "Asia/Kolkata",
        )]);

        store.set_active(JobName::UpdateMfNavCache, false).await.unwrap();

        let mut stale = store.get(JobName::UpdateMfNavCache).unwrap();
        stale.is_active = true;
        stale.cron_expression = "0 0 1 * * *".to_string();
        stale.status = Some(TaskStatus::Failed);
        stale.error_message = Some("NAV API unreachable".to_string());
        store
            .update_execution(JobName::UpdateMfNavCache, &stale.execution())
            .await
            .unwrap();

        let record = store.get(JobName::UpdateMfNavCache).unwrap();
        assert!(!record.is_active);
        assert_eq!(record.cron_expression, "0 30 22 * * *");
        assert_eq!(record.status, Some(TaskStatus::Failed));
        assert_eq!(record.error_message.as_deref(), Some("NAV API unreachable"));
        assert_eq!(
            store.status_history(JobName::UpdateMfNavCache),
            vec![Some(TaskStatus::Failed)]
        );
    }

    #[tokio::test]
    async fn test_updates_to_unknown_job_are_not_found() {
        let store = InMemoryScheduledTaskStore::new();
        let update =
            ScheduledTask::new(1, JobName::WeeklyPfReport, "0 0 9 * * SAT", "UTC").execution();

        assert!(matches!(
            store.update_execution(JobName::WeeklyPfReport, &update).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.set_active(JobName::WeeklyPfReport, true).await,
            Err(AppError::NotFound(_))
        ));
        assert!(store.status_history(JobName::WeeklyPfReport).is_empty());
    }

    #[tokio::test]
    async fn test_status_history_is_bounded() {
        let store = InMemoryScheduledTaskStore::with_tasks(vec![
            ScheduledTask::new(1, JobName::ClearMfNavCache, "0 0 6 * * *", "UTC"),
            ScheduledTask::new(2, JobName::ReloadWatchlist, "0 0 8 * * *", "UTC"),
        ]);
        let mut update = store.get(JobName::ClearMfNavCache).unwrap().execution();

        update.status = Some(TaskStatus::InProgress);
        store.update_execution(JobName::ReloadWatchlist, &update).await.unwrap();
        update.status = Some(TaskStatus::Completed);
        for _ in 0..STATUS_HISTORY_CAPACITY + 10 {
            store.update_execution(JobName::ClearMfNavCache, &update).await.unwrap();
        }

        assert_eq!(
            store.status_history(JobName::ClearMfNavCache).len(),
            STATUS_HISTORY_CAPACITY
        );
        assert!(store.status_history(JobName::ReloadWatchlist).is_empty());

        store.clear_history();
        assert!(store.status_history(JobName::ClearMfNavCache).is_empty());
        assert_eq!(
            store.get(JobName::ClearMfNavCache).unwrap().status,
            Some(TaskStatus::Completed)
        );
    }
}
