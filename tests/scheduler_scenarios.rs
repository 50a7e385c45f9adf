/// Scheduler scenario tests
///
/// Drives the assembled services end to end against in-memory stores:
/// - a slow job recorded with its real duration
/// - the restart job recorded as completed before the restart happens
/// - operator activate/deactivate followed by manual runs
/// - a timer actually firing a job
/// - the IPO and NAV caches behind their jobs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use vest_scheduler::external::collaborators::{ApplicationControl, Notifier, PortfolioOperations};
use vest_scheduler::external::ipo_provider::{IpoProvider, IpoProviderError};
use vest_scheduler::external::nav_provider::{NavProvider, NavProviderError};
use vest_scheduler::models::{
    IpoData, IpoList, JobName, MutualFundNav, Nav, ScheduledTask, StatusChange, TaskStatus,
};
use vest_scheduler::services::ipo_cache_service::{IpoCacheService, IPO_CACHE_KEY};
use vest_scheduler::services::job_scheduler_service::JobContext;
use vest_scheduler::services::nav_cache_service::NavCacheService;
use vest_scheduler::services::task_execution_service::ExecutionOutcome;
use vest_scheduler::state::AppState;
use vest_scheduler::store::{CacheStore, InMemoryCacheStore, InMemoryScheduledTaskStore, ScheduledTaskStore};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Collaborators {
    calls: Mutex<Vec<String>>,
    /// Status of RESTART_APPLICATION as seen from inside the restart call.
    status_at_restart: Mutex<Option<TaskStatus>>,
    tasks: Mutex<Option<InMemoryScheduledTaskStore>>,
    failed_reported: Mutex<Vec<JobName>>,
}

impl Collaborators {
    fn record(&self, call: &str) {
        self.calls.lock().push(call.to_string());
    }
}

#[async_trait]
impl PortfolioOperations for Collaborators {
    async fn reload_instruments(&self) -> anyhow::Result<()> {
        tokio::time::sleep(Duration::from_secs(2)).await;
        self.record("reload_instruments");
        Ok(())
    }
    async fn reload_watchlist(&self) -> anyhow::Result<()> {
        self.record("reload_watchlist");
        Ok(())
    }
    async fn capture_account_snapshot(&self) -> anyhow::Result<()> {
        self.record("capture_account_snapshot");
        anyhow::bail!("broker session missing")
    }
    async fn weekly_portfolio_report(&self) -> anyhow::Result<()> {
        self.record("weekly_portfolio_report");
        Ok(())
    }
    async fn monthly_portfolio_report(&self) -> anyhow::Result<()> {
        self.record("monthly_portfolio_report");
        Ok(())
    }
    async fn quarterly_portfolio_report(&self) -> anyhow::Result<()> {
        self.record("quarterly_portfolio_report");
        Ok(())
    }
    async fn yearly_portfolio_report(&self) -> anyhow::Result<()> {
        self.record("yearly_portfolio_report");
        Ok(())
    }
    async fn monthly_sip_report(&self) -> anyhow::Result<()> {
        self.record("monthly_sip_report");
        Ok(())
    }
}

#[async_trait]
impl Notifier for Collaborators {
    async fn notify_failed_jobs(&self, failed: &[ScheduledTask]) -> anyhow::Result<()> {
        self.failed_reported
            .lock()
            .extend(failed.iter().map(|t| t.job_name));
        Ok(())
    }

    async fn notify_open_ipos(&self, _closing: &[IpoData]) -> anyhow::Result<()> {
        Ok(())
    }
}

impl ApplicationControl for Collaborators {
    fn restart(&self) -> anyhow::Result<()> {
        let status = self
            .tasks
            .lock()
            .as_ref()
            .and_then(|store| store.get(JobName::RestartApplication))
            .and_then(|task| task.status);
        *self.status_at_restart.lock() = status;
        self.record("restart");
        Ok(())
    }
}

struct CountingIpoProvider {
    calls: AtomicUsize,
    listing: IpoList,
}

#[async_trait]
impl IpoProvider for CountingIpoProvider {
    async fn fetch_ipos(&self, _account_id: &str) -> Result<IpoList, IpoProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.listing.clone())
    }
}

struct FixedNavProvider {
    current: Mutex<f64>,
}

#[async_trait]
impl NavProvider for FixedNavProvider {
    async fn fetch_nav(&self, isin: &str) -> Result<Option<MutualFundNav>, NavProviderError> {
        if isin.starts_with("MISSING") {
            return Err(NavProviderError::NotFound(isin.to_string()));
        }
        let current = *self.current.lock();
        Ok(Some(nav(current)))
    }
}

fn nav(current: f64) -> MutualFundNav {
    MutualFundNav {
        code: Some("120503".to_string()),
        name: Some("Sample Flexi Cap Fund".to_string()),
        short_name: None,
        category: None,
        fund_house: None,
        fund_name: None,
        short_code: None,
        detail_info: None,
        nav: Some(Nav { nav: current, date: None }),
        last_nav: Some(Nav { nav: 99.0, date: None }),
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    state: AppState,
    tasks: InMemoryScheduledTaskStore,
    cache: InMemoryCacheStore,
    collaborators: Arc<Collaborators>,
    ipo_provider: Arc<CountingIpoProvider>,
    nav_provider: Arc<FixedNavProvider>,
}

fn seeded_tasks(cron: &str) -> Vec<ScheduledTask> {
    JobName::ALL
        .iter()
        .enumerate()
        .map(|(i, job)| ScheduledTask::new(i as i64 + 1, *job, cron, "Asia/Kolkata"))
        .collect()
}

async fn harness(tasks: Vec<ScheduledTask>) -> Harness {
    let store = InMemoryScheduledTaskStore::with_tasks(tasks);
    let tasks_dyn: Arc<dyn ScheduledTaskStore> = Arc::new(store.clone());
    let cache = InMemoryCacheStore::new();
    let ttl = Duration::from_secs(24 * 60 * 60);

    let collaborators = Arc::new(Collaborators::default());
    *collaborators.tasks.lock() = Some(store.clone());

    let ipo_provider = Arc::new(CountingIpoProvider {
        calls: AtomicUsize::new(0),
        listing: IpoList {
            status: Some("success".to_string()),
            data: vec![IpoData {
                symbol: "ACME".to_string(),
                status: "ongoing".to_string(),
                ..Default::default()
            }],
        },
    });
    let nav_provider = Arc::new(FixedNavProvider {
        current: Mutex::new(100.0),
    });

    let jobs = JobContext {
        tasks: tasks_dyn.clone(),
        ipo_cache: Arc::new(IpoCacheService::new(
            Arc::new(cache.clone()),
            ipo_provider.clone(),
            Some("AB1234".to_string()),
            ttl,
        )),
        nav_cache: Arc::new(NavCacheService::new(
            Arc::new(cache.clone()),
            nav_provider.clone(),
            ttl,
        )),
        portfolio: collaborators.clone(),
        notifier: collaborators.clone(),
        app_control: collaborators.clone(),
        notification_tz: chrono_tz::Asia::Kolkata,
    };

    let state = AppState::load(tasks_dyn, jobs).await.unwrap();
    Harness {
        state,
        tasks: store,
        cache,
        collaborators,
        ipo_provider,
        nav_provider,
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_job_records_its_duration() {
    let h = harness(seeded_tasks("0 0 8 * * MON-FRI")).await;

    let outcome = h.state.admin.execute_task("RELOAD_INSTRUMENTS").await.unwrap();

    assert_eq!(outcome, ExecutionOutcome::Completed);
    let task = h.tasks.get(JobName::ReloadInstruments).unwrap();
    assert_eq!(task.status, Some(TaskStatus::Completed));
    assert_eq!(task.error_message, None);
    assert!(task.last_execution_date.is_some());

    let took = task.last_duration().unwrap();
    assert!(took >= chrono::Duration::milliseconds(1900), "took {:?}", took);
    assert!(took < chrono::Duration::seconds(10), "took {:?}", took);
    assert_eq!(
        h.tasks.status_history(JobName::ReloadInstruments),
        vec![Some(TaskStatus::InProgress), Some(TaskStatus::Completed)]
    );
}

#[tokio::test]
async fn restart_is_marked_completed_before_it_runs() {
    let h = harness(seeded_tasks("0 0 4 * * *")).await;

    let outcome = h.state.admin.execute_task("RESTART_APPLICATION").await.unwrap();

    assert_eq!(outcome, ExecutionOutcome::Completed);
    assert_eq!(*h.collaborators.status_at_restart.lock(), Some(TaskStatus::Completed));
    assert_eq!(*h.collaborators.calls.lock(), vec!["restart".to_string()]);
}

#[tokio::test]
async fn deactivated_job_is_skipped_until_reactivated() {
    let h = harness(seeded_tasks("0 0 8 * * *")).await;
    let id = h.tasks.get(JobName::WeeklyPfReport).unwrap().id.to_string();

    h.state
        .admin
        .update_task_status(&id, StatusChange::Deactivate)
        .await
        .unwrap();
    assert_eq!(
        h.state.admin.execute_task("weekly_pf_report").await.unwrap(),
        ExecutionOutcome::Skipped
    );
    let skipped = h.tasks.get(JobName::WeeklyPfReport).unwrap();
    assert_eq!(skipped.status, Some(TaskStatus::Skipped));
    assert!(skipped.execution_end_time.is_some());
    assert!(h.collaborators.calls.lock().is_empty());

    h.state
        .admin
        .update_task_status("WEEKLY_PF_REPORT", StatusChange::Activate)
        .await
        .unwrap();
    assert_eq!(
        h.state.admin.execute_task(&id).await.unwrap(),
        ExecutionOutcome::Completed
    );
    assert_eq!(*h.collaborators.calls.lock(), vec!["weekly_portfolio_report".to_string()]);
}

#[tokio::test]
async fn failed_job_is_reported_by_error_notification() {
    let h = harness(seeded_tasks("0 0 8 * * *")).await;

    let outcome = h.state.admin.execute_task("CAPTURE_ACCOUNT_SNAPSHOT").await.unwrap();
    assert_eq!(outcome, ExecutionOutcome::Failed("broker session missing".to_string()));

    let notified = h
        .state
        .admin
        .execute_task("SCHEDULER_ERROR_NOTIFICATION")
        .await
        .unwrap();
    assert_eq!(notified, ExecutionOutcome::Completed);
    assert_eq!(
        *h.collaborators.failed_reported.lock(),
        vec![JobName::CaptureAccountSnapshot]
    );
}

#[tokio::test]
async fn ipo_job_fills_cache_used_by_readers() {
    let h = harness(seeded_tasks("0 0 7 * * *")).await;

    let outcome = h.state.admin.execute_task("RETRIEVE_IPO_DETAILS").await.unwrap();
    assert_eq!(outcome, ExecutionOutcome::Completed);
    assert_eq!(h.ipo_provider.calls.load(Ordering::SeqCst), 1);
    assert!(h.cache.get(IPO_CACHE_KEY).await.unwrap().is_some());

    let listing = h.state.jobs.ipo_cache.get_ipos().await;
    assert_eq!(listing.len(), 1);
    assert_eq!(h.ipo_provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn nav_jobs_refresh_and_clear_cache() {
    let h = harness(seeded_tasks("0 0 7 * * *")).await;
    let nav_cache = h.state.jobs.nav_cache.clone();

    assert!(nav_cache.get_nav("INF209K01YN0").await.is_some());
    assert!(nav_cache.get_nav("MISSING01").await.is_none());
    assert_eq!(h.cache.len(), 1);
    let writes = h.cache.write_count();

    // Same value upstream: nothing rewritten.
    assert_eq!(
        h.state.admin.execute_task("UPDATE_MF_NAV_CACHE").await.unwrap(),
        ExecutionOutcome::Completed
    );
    assert_eq!(h.cache.write_count(), writes);

    *h.nav_provider.current.lock() = 105.0;
    h.state.admin.execute_task("UPDATE_MF_NAV_CACHE").await.unwrap();
    assert_eq!(h.cache.write_count(), writes + 1);
    assert_eq!(
        nav_cache.get_nav("INF209K01YN0").await.unwrap().current_nav(),
        Some(105.0)
    );

    assert_eq!(
        h.state.admin.execute_task("CLEAR_MF_NAV_CACHE").await.unwrap(),
        ExecutionOutcome::Completed
    );
    assert!(h.cache.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timer_fires_registered_job() {
    let mut tasks = seeded_tasks("0 0 3 1 1 *");
    for task in tasks.iter_mut() {
        if task.job_name == JobName::ReloadWatchlist {
            task.cron_expression = "* * * * * *".to_string();
        }
        if task.job_name == JobName::YearlyPfReport {
            task.cron_expression = "every day at noon".to_string();
        }
    }
    let h = harness(tasks).await;

    let mut scheduler = h.state.scheduler().await.unwrap();
    let report = scheduler.start().await.unwrap();
    assert_eq!(report.registered.len(), JobName::ALL.len() - 1);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].0, JobName::YearlyPfReport);

    let mut fired = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let task = h.tasks.get(JobName::ReloadWatchlist).unwrap();
        if task.status == Some(TaskStatus::Completed) {
            fired = true;
            break;
        }
    }
    scheduler.stop().await.unwrap();

    assert!(fired, "RELOAD_WATCHLIST never fired");
    assert!(h.collaborators.calls.lock().iter().any(|c| c == "reload_watchlist"));
}

#[tokio::test]
async fn next_fire_time_follows_stored_zone() {
    let h = harness(seeded_tasks("0 30 9 * * *")).await;

    let next = h
        .state
        .admin
        .next_fire_time(JobName::OpenIpoNotification)
        .unwrap()
        .unwrap();

    assert_eq!(next.format("%H:%M:%S").to_string(), "09:30:00");
    assert!(next > chrono::Utc::now());
}
