//! Tells administrators which jobs ended in FAILED on their latest run.

use tracing::info;

use crate::models::TaskStatus;
use crate::services::job_scheduler_service::JobContext;

pub async fn run(ctx: &JobContext) -> anyhow::Result<()> {
    let failed: Vec<_> = ctx
        .tasks
        .find_all()
        .await?
        .into_iter()
        .filter(|task| task.status == Some(TaskStatus::Failed))
        .collect();

    if failed.is_empty() {
        info!("✅ No failed jobs to report");
        return Ok(());
    }

    info!("📧 Reporting {} failed job(s) to administrators", failed.len());
    ctx.notifier.notify_failed_jobs(&failed).await
}
