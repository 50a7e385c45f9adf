//! Business collaborators invoked by scheduled jobs.
//!
//! Report generation, instrument loading and notification delivery live
//! outside this crate. Jobs only see these traits and treat every call as an
//! opaque unit of work that either succeeds or fails.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::models::{IpoData, ScheduledTask};

#[async_trait]
pub trait PortfolioOperations: Send + Sync {
    async fn reload_instruments(&self) -> anyhow::Result<()>;
    async fn reload_watchlist(&self) -> anyhow::Result<()>;
    async fn capture_account_snapshot(&self) -> anyhow::Result<()>;
    async fn weekly_portfolio_report(&self) -> anyhow::Result<()>;
    async fn monthly_portfolio_report(&self) -> anyhow::Result<()>;
    async fn quarterly_portfolio_report(&self) -> anyhow::Result<()>;
    async fn yearly_portfolio_report(&self) -> anyhow::Result<()>;
    async fn monthly_sip_report(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_failed_jobs(&self, failed: &[ScheduledTask]) -> anyhow::Result<()>;
    async fn notify_open_ipos(&self, closing: &[IpoData]) -> anyhow::Result<()>;
}

pub trait ApplicationControl: Send + Sync {
    /// Terminate the process so the supervisor starts a fresh one.
    fn restart(&self) -> anyhow::Result<()>;
}

/// Stand-in used when the portfolio services are not wired into this process.
pub struct LoggingPortfolioOperations;

#[async_trait]
impl PortfolioOperations for LoggingPortfolioOperations {
    async fn reload_instruments(&self) -> anyhow::Result<()> {
        info!("📈 Instrument reload requested (no portfolio service attached)");
        Ok(())
    }

    async fn reload_watchlist(&self) -> anyhow::Result<()> {
        info!("👀 Watchlist reload requested (no portfolio service attached)");
        Ok(())
    }

    async fn capture_account_snapshot(&self) -> anyhow::Result<()> {
        info!("📸 Account snapshot requested (no portfolio service attached)");
        Ok(())
    }

    async fn weekly_portfolio_report(&self) -> anyhow::Result<()> {
        info!("📊 Weekly portfolio report requested (no portfolio service attached)");
        Ok(())
    }

    async fn monthly_portfolio_report(&self) -> anyhow::Result<()> {
        info!("📊 Monthly portfolio report requested (no portfolio service attached)");
        Ok(())
    }

    async fn quarterly_portfolio_report(&self) -> anyhow::Result<()> {
        info!("📊 Quarterly portfolio report requested (no portfolio service attached)");
        Ok(())
    }

    async fn yearly_portfolio_report(&self) -> anyhow::Result<()> {
        info!("📊 Yearly portfolio report requested (no portfolio service attached)");
        Ok(())
    }

    async fn monthly_sip_report(&self) -> anyhow::Result<()> {
        info!("📊 Monthly SIP report requested (no portfolio service attached)");
        Ok(())
    }
}

/// Writes notifications to the log instead of sending them.
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify_failed_jobs(&self, failed: &[ScheduledTask]) -> anyhow::Result<()> {
        for task in failed {
            warn!(
                "📧 Failed job: {} at {:?}: {}",
                task.job_name,
                task.execution_end_time,
                task.error_message.as_deref().unwrap_or("<no message>")
            );
        }
        Ok(())
    }

    async fn notify_open_ipos(&self, closing: &[IpoData]) -> anyhow::Result<()> {
        for ipo in closing {
            info!(
                "📧 IPO closing soon: {} ({}) ends {}",
                ipo.name,
                ipo.symbol,
                ipo.end_at.as_deref().unwrap_or("?")
            );
        }
        Ok(())
    }
}

/// Exits the process; the service manager is expected to start it again.
pub struct ProcessControl;

impl ApplicationControl for ProcessControl {
    fn restart(&self) -> anyhow::Result<()> {
        info!("♻️  Restarting application");
        std::process::exit(0)
    }
}
