//! Cache maintenance jobs.
//!
//! - `CLEAR_MF_NAV_CACHE` drops every cached NAV so the next lookups start fresh.
//! - `UPDATE_MF_NAV_CACHE` re-fetches each cached fund and rewrites only the
//!   entries whose NAV moved.
//! - `RETRIEVE_IPO_DETAILS` replaces the cached IPO listing.
//!
//! A failure to enumerate the cache is returned so the run is recorded as
//! failed. Per-fund upstream failures are only counted.

use anyhow::Context;
use tracing::info;

use crate::services::job_scheduler_service::JobContext;

pub async fn clear_nav_cache(ctx: &JobContext) -> anyhow::Result<()> {
    let removed = ctx
        .nav_cache
        .empty_cache()
        .await
        .context("Failed to clear NAV cache")?;
    info!("🧹 NAV cache cleared ({} entries)", removed);
    Ok(())
}

pub async fn update_nav_cache(ctx: &JobContext) -> anyhow::Result<()> {
    let summary = ctx
        .nav_cache
        .update_cache()
        .await
        .context("Failed to refresh NAV cache")?;
    info!(
        "✅ NAV cache refreshed (updated: {}, unchanged: {}, unavailable: {})",
        summary.updated, summary.unchanged, summary.unavailable
    );
    Ok(())
}

pub async fn retrieve_ipo_details(ctx: &JobContext) -> anyhow::Result<()> {
    let cached = ctx.ipo_cache.refresh().await?;
    info!("✅ IPO details retrieved ({} IPOs)", cached);
    Ok(())
}
