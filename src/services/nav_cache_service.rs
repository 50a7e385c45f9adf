use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::external::nav_provider::{NavProvider, NavProviderError};
use crate::models::MutualFundNav;
use crate::store::{CacheError, CacheStore};

pub const NAV_CACHE_KEY_PREFIX: &str = "nav:";

/// Outcome of one bulk NAV refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavRefreshSummary {
    pub scanned: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub unavailable: usize,
}

/// Per-fund cache of mutual fund NAVs keyed by `nav:<isin>`.
pub struct NavCacheService {
    cache: Arc<dyn CacheStore>,
    provider: Arc<dyn NavProvider>,
    ttl: Duration,
}

fn cache_key(isin: &str) -> String {
    format!("{}{}", NAV_CACHE_KEY_PREFIX, isin)
}

impl NavCacheService {
    pub fn new(cache: Arc<dyn CacheStore>, provider: Arc<dyn NavProvider>, ttl: Duration) -> Self {
        Self { cache, provider, ttl }
    }

    /// Cached NAV for a fund, fetching and caching it on a miss.
    pub async fn get_nav(&self, isin: &str) -> Option<MutualFundNav> {
        let key = cache_key(isin);
        if let Some(cached) = self.cached(&key).await {
            return Some(cached);
        }

        let fetched = self.fetch(isin).await?;
        self.store(&key, &fetched).await;
        Some(fetched)
    }

    /// Remove every cached NAV. Returns the number of entries deleted.
    pub async fn empty_cache(&self) -> Result<u64, CacheError> {
        let keys = self.cache.keys_with_prefix(NAV_CACHE_KEY_PREFIX).await?;
        if keys.is_empty() {
            info!("🧹 NAV cache already empty");
            return Ok(0);
        }

        let removed = self.cache.delete_many(&keys).await?;
        info!("🧹 Cleared {} NAV cache entries", removed);
        Ok(removed)
    }

    /// Re-fetch every cached fund and overwrite only the entries whose
    /// values moved.
    pub async fn update_cache(&self) -> Result<NavRefreshSummary, CacheError> {
        let keys = self.cache.keys_with_prefix(NAV_CACHE_KEY_PREFIX).await?;
        info!("🔄 Refreshing {} cached NAVs...", keys.len());

        let mut summary = NavRefreshSummary {
            scanned: keys.len(),
            ..Default::default()
        };

        for key in &keys {
            let isin = &key[NAV_CACHE_KEY_PREFIX.len()..];
            let Some(fresh) = self.fetch(isin).await else {
                summary.unavailable += 1;
                continue;
            };

            let changed = match self.cached(key).await {
                Some(current) => current.nav_differs(&fresh),
                None => true,
            };

            if changed {
                debug!("NAV changed for {}", isin);
                self.store(key, &fresh).await;
                summary.updated += 1;
            } else {
                summary.unchanged += 1;
            }
        }

        info!(
            "✅ NAV refresh: {} scanned, {} updated, {} unchanged, {} unavailable",
            summary.scanned, summary.updated, summary.unchanged, summary.unavailable
        );
        Ok(summary)
    }

    async fn fetch(&self, isin: &str) -> Option<MutualFundNav> {
        match self.provider.fetch_nav(isin).await {
            Ok(Some(nav)) => Some(nav),
            Ok(None) => {
                debug!("Incomplete NAV payload for {}", isin);
                None
            }
            Err(NavProviderError::NotFound(_)) => {
                warn!("No NAV published for {}", isin);
                None
            }
            Err(e) => {
                error!("Error while fetching NAV for {}: {}", isin, e);
                None
            }
        }
    }

    async fn cached(&self, key: &str) -> Option<MutualFundNav> {
        let raw = match self.cache.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                error!("Error while reading {} from cache: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(nav) => Some(nav),
            Err(e) => {
                warn!("Discarding unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    async fn store(&self, key: &str, nav: &MutualFundNav) {
        let raw = match serde_json::to_string(nav) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Error while serializing NAV for {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.cache.set(key, raw, self.ttl).await {
            error!("Error while caching {}: {}", key, e);
        }
    }
}
