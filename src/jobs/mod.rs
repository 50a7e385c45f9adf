//! Job catalog
//!
//! Maps every [`JobName`] to the work it performs. Scheduled fires and manual
//! runs from the admin service both go through [`execute_tracked`], so every
//! run is recorded the same way.
//!
//! # Available Jobs
//!
//! - `cache_refresh_jobs` - NAV cache clear/refresh and the IPO listing refresh
//! - `scheduler_error_notification_job` - tells admins which jobs last failed
//! - `open_ipo_notification_job` - announces IPOs closing today or tomorrow
//!
//! The remaining jobs delegate straight to the portfolio collaborator, and
//! `RESTART_APPLICATION` hands over to the application control.

pub mod cache_refresh_jobs;
pub mod open_ipo_notification_job;
pub mod scheduler_error_notification_job;

use crate::models::JobName;
use crate::services::job_scheduler_service::JobContext;
use crate::services::task_execution_service::{ExecutionOutcome, TaskExecutionService};

/// Run the body of `job_name` once.
pub async fn run_job(job_name: JobName, ctx: &JobContext) -> anyhow::Result<()> {
    match job_name {
        JobName::ReloadInstruments => ctx.portfolio.reload_instruments().await,
        JobName::ReloadWatchlist => ctx.portfolio.reload_watchlist().await,
        JobName::CaptureAccountSnapshot => ctx.portfolio.capture_account_snapshot().await,
        JobName::WeeklyPfReport => ctx.portfolio.weekly_portfolio_report().await,
        JobName::MonthlyPfReport => ctx.portfolio.monthly_portfolio_report().await,
        JobName::QuarterlyPfReport => ctx.portfolio.quarterly_portfolio_report().await,
        JobName::YearlyPfReport => ctx.portfolio.yearly_portfolio_report().await,
        JobName::MonthlySipReport => ctx.portfolio.monthly_sip_report().await,
        JobName::ClearMfNavCache => cache_refresh_jobs::clear_nav_cache(ctx).await,
        JobName::UpdateMfNavCache => cache_refresh_jobs::update_nav_cache(ctx).await,
        JobName::RetrieveIpoDetails => cache_refresh_jobs::retrieve_ipo_details(ctx).await,
        JobName::SchedulerErrorNotification => scheduler_error_notification_job::run(ctx).await,
        JobName::OpenIpoNotification => open_ipo_notification_job::run(ctx).await,
        JobName::RestartApplication => ctx.app_control.restart(),
    }
}

/// Run `job_name` under the execution wrapper.
pub async fn execute_tracked(
    executor: &TaskExecutionService,
    ctx: &JobContext,
    job_name: JobName,
) -> ExecutionOutcome {
    executor.execute(job_name, || run_job(job_name, ctx)).await
}
