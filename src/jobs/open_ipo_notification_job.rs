//! Announces ongoing IPOs that close today or tomorrow.
//!
//! "Today" is taken in the notification time zone, not the job's own zone.

use chrono::{NaiveDate, Utc};
use tracing::info;

use crate::services::job_scheduler_service::JobContext;

pub async fn run(ctx: &JobContext) -> anyhow::Result<()> {
    let today = Utc::now().with_timezone(&ctx.notification_tz).date_naive();
    run_for(ctx, today).await
}

pub(crate) async fn run_for(ctx: &JobContext, today: NaiveDate) -> anyhow::Result<()> {
    let tomorrow = today.succ_opt().unwrap_or(today);
    let closing = ctx.ipo_cache.ipos_closing_between(today, tomorrow).await;

    if closing.is_empty() {
        info!("No open IPOs closing on {} or {}", today, tomorrow);
        return Ok(());
    }

    info!("📧 Notifying about {} IPO(s) closing soon", closing.len());
    ctx.notifier.notify_open_ipos(&closing).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IpoData, IpoList};
    use crate::services::job_scheduler_service::test_support::{context, RecordingCollaborators};
    use crate::store::InMemoryScheduledTaskStore;
    use std::sync::Arc;

    fn ipo(symbol: &str, status: &str, end_at: &str) -> IpoData {
        IpoData {
            symbol: symbol.to_string(),
            status: status.to_string(),
            end_at: Some(end_at.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_notifies_ipos_closing_today_and_tomorrow() {
        let ipos = IpoList {
            status: Some("success".to_string()),
            data: vec![
                ipo("TODAY", "ongoing", "2025-03-12T17:00:00+05:30"),
                ipo("TOMORROW", "ongoing", "2025-03-13"),
                ipo("NEXTWEEK", "ongoing", "2025-03-19"),
                ipo("UPCOMING", "upcoming", "2025-03-13"),
            ],
        };
        let collaborators = Arc::new(RecordingCollaborators::default());
        let ctx = context(
            Arc::new(InMemoryScheduledTaskStore::new()),
            ipos,
            collaborators.clone(),
        );

        run_for(&ctx, NaiveDate::from_ymd_opt(2025, 3, 12).unwrap())
            .await
            .unwrap();

        assert_eq!(
            *collaborators.ipo_symbols.lock(),
            vec!["TODAY".to_string(), "TOMORROW".to_string()]
        );
    }

    #[tokio::test]
    async fn test_no_notification_when_nothing_closes() {
        let collaborators = Arc::new(RecordingCollaborators::default());
        let ctx = context(
            Arc::new(InMemoryScheduledTaskStore::new()),
            IpoList::empty(),
            collaborators.clone(),
        );

        run_for(&ctx, NaiveDate::from_ymd_opt(2025, 3, 12).unwrap())
            .await
            .unwrap();

        assert!(collaborators.ipo_symbols.lock().is_empty());
    }
}
