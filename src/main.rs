use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};

use vest_scheduler::config::AppConfig;
use vest_scheduler::external::collaborators::{LoggingNotifier, LoggingPortfolioOperations, ProcessControl};
use vest_scheduler::external::kite_internal::{KiteInternalProvider, StaticCredentialSource};
use vest_scheduler::external::mf_nav_api::MfNavApiProvider;
use vest_scheduler::logging::{init_logging, LoggingConfig};
use vest_scheduler::services::ipo_cache_service::IpoCacheService;
use vest_scheduler::services::job_scheduler_service::JobContext;
use vest_scheduler::services::nav_cache_service::NavCacheService;
use vest_scheduler::state::AppState;
use vest_scheduler::store::{CacheStore, InMemoryCacheStore, PgScheduledTaskStore, RedisCacheStore, ScheduledTaskStore};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().map_err(anyhow::Error::msg)?;
    config.validate().map_err(anyhow::Error::msg)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.scheduler_pool_size)
        .thread_name("vest-scheduler")
        .enable_all()
        .build()
        .context("Failed to build the scheduler runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
    info!("🧵 Scheduler pool size: {}", config.scheduler_pool_size);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to the database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let cache: Arc<dyn CacheStore> = match &config.redis_url {
        Some(url) => {
            info!("🗄️  Using Redis cache");
            Arc::new(RedisCacheStore::connect(url).await?)
        }
        None => {
            warn!("🗄️  REDIS_URL not set, using in-process cache");
            Arc::new(InMemoryCacheStore::new())
        }
    };

    let credentials = Arc::new(StaticCredentialSource::new(config.kite_enc_token.clone()));
    let ipo_provider = KiteInternalProvider::new(&config.kite_oms_base_url, credentials, config.http_timeout)?;
    let nav_provider = MfNavApiProvider::new(&config.mf_nav_api_url, config.http_timeout)?;

    let ipo_cache = Arc::new(IpoCacheService::new(
        cache.clone(),
        Arc::new(ipo_provider),
        config.internal_trading_user.clone(),
        config.cache_ttl,
    ));
    ipo_cache.init().await;
    let nav_cache = Arc::new(NavCacheService::new(cache, Arc::new(nav_provider), config.cache_ttl));

    let tasks: Arc<dyn ScheduledTaskStore> = Arc::new(PgScheduledTaskStore::new(pool));
    let portfolio = Arc::new(LoggingPortfolioOperations);
    let notifier = Arc::new(LoggingNotifier);
    let jobs = JobContext {
        tasks: tasks.clone(),
        ipo_cache,
        nav_cache,
        portfolio,
        notifier,
        app_control: Arc::new(ProcessControl),
        notification_tz: config.notification_tz().map_err(anyhow::Error::msg)?,
    };

    let state = AppState::load(tasks, jobs).await?;
    let mut scheduler = state.scheduler().await?;
    let report = scheduler.start().await?;
    for (job, reason) in &report.rejected {
        error!(job = %job, "⚠️  {} will not run: {}", job, reason);
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("👋 Shutdown requested");
    scheduler.stop().await?;

    Ok(())
}
