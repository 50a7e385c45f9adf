use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::models::{JobName, ScheduledTask, TaskStatus};
use crate::store::ScheduledTaskStore;

/// What happened to one fire of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Completed,
    Failed(String),
    /// The job is deactivated; its body was not run.
    Skipped,
    /// No execution record exists (or it could not be read); nothing was run.
    NotConfigured,
    /// A previous fire of the same job has not finished yet; nothing was run.
    AlreadyRunning,
}

/// Runs job bodies under a persisted lifecycle record.
///
/// Failures of the body, including panics, end up in the record and never
/// reach the caller. Failures to write the record are logged and ignored.
pub struct TaskExecutionService {
    store: Arc<dyn ScheduledTaskStore>,
    running: DashMap<JobName, ()>,
}

/// Marks a job as running until dropped.
struct RunningGuard<'a> {
    running: &'a DashMap<JobName, ()>,
    job_name: JobName,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.running.remove(&self.job_name);
    }
}

impl TaskExecutionService {
    pub fn new(store: Arc<dyn ScheduledTaskStore>) -> Self {
        Self {
            store,
            running: DashMap::new(),
        }
    }

    pub fn is_running(&self, job_name: JobName) -> bool {
        self.running.contains_key(&job_name)
    }

    pub async fn execute<F, Fut>(&self, job_name: JobName, work: F) -> ExecutionOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        if self.running.insert(job_name, ()).is_some() {
            warn!(job = %job_name, "⏳ {} is still running from a previous fire, not starting again", job_name);
            return ExecutionOutcome::AlreadyRunning;
        }
        let _guard = RunningGuard {
            running: &self.running,
            job_name,
        };

        info!(job = %job_name, "🏃 Starting job: {}", job_name);

        let mut task = match self.store.find_by_name(job_name).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                warn!(job = %job_name, "No execution record for {}, skipping", job_name);
                return ExecutionOutcome::NotConfigured;
            }
            Err(e) => {
                error!(job = %job_name, "Failed to load execution record for {}: {}", job_name, e);
                return ExecutionOutcome::NotConfigured;
            }
        };
        debug!(
            job = %job_name,
            "Record {}: active={} last_start={:?}",
            task.id, task.is_active, task.execution_start_time
        );

        if !task.is_active {
            info!(job = %job_name, "⏭️  {} is inactive, skipping", job_name);
            self.finish(&mut task, TaskStatus::Skipped, None).await;
            return ExecutionOutcome::Skipped;
        }

        self.start(&mut task).await;

        // The restart job may take the process down before it can report back
        if job_name == JobName::RestartApplication {
            info!(job = %job_name, "Marking {} completed ahead of the restart", job_name);
            self.finish(&mut task, TaskStatus::Completed, None).await;
        }

        let result = AssertUnwindSafe(async { work().await }).catch_unwind().await;

        let outcome = match result {
            Ok(Ok(())) => ExecutionOutcome::Completed,
            Ok(Err(e)) => ExecutionOutcome::Failed(format!("{:#}", e)),
            Err(panic) => ExecutionOutcome::Failed(panic_message(panic)),
        };

        match &outcome {
            ExecutionOutcome::Failed(message) => {
                error!(job = %job_name, "❌ Job failed: {} - {}", job_name, message);
                self.finish(&mut task, TaskStatus::Failed, Some(message.clone())).await;
            }
            _ => {
                self.finish(&mut task, TaskStatus::Completed, None).await;
                let took = task
                    .last_duration()
                    .map(|d| d.num_milliseconds())
                    .unwrap_or_default();
                info!(job = %job_name, "✅ Job completed: {} (duration: {}ms)", job_name, took);
            }
        }

        outcome
    }

    async fn start(&self, task: &mut ScheduledTask) {
        let now = Utc::now();
        task.status = Some(TaskStatus::InProgress);
        task.last_execution_date = Some(now.date_naive());
        task.execution_start_time = Some(now);
        task.execution_end_time = None;
        self.persist(task).await;
    }

    async fn finish(&self, task: &mut ScheduledTask, status: TaskStatus, error_message: Option<String>) {
        task.status = Some(status);
        task.error_message = error_message;
        task.execution_end_time = Some(Utc::now());
        self.persist(task).await;
    }

    /// Writes only the lifecycle columns, so an `is_active` or schedule change
    /// made while the job runs is kept.
    async fn persist(&self, task: &ScheduledTask) {
        match self.store.update_execution(task.job_name, &task.execution()).await {
            Ok(()) => debug!(
                job = %task.job_name,
                "Saved {} status {:?}",
                task.job_name, task.status
            ),
            Err(e) => error!(
                job = %task.job_name,
                "Failed to save execution record for {}: {}",
                task.job_name, e
            ),
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("job panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("job panicked: {}", s)
    } else {
        "job panicked".to_string()
    }
}
