use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::errors::AppError;
use crate::external::ipo_provider::{IpoProvider, IpoProviderError};
use crate::models::{IpoData, IpoList};
use crate::store::CacheStore;

pub const IPO_CACHE_KEY: &str = "kite-ipo-response";

/// Fetch-through cache for the broker's IPO listing.
///
/// The whole listing is stored under one key. Upstream calls are made on
/// behalf of the internal service account; without one configured the
/// upstream is never called.
pub struct IpoCacheService {
    cache: Arc<dyn CacheStore>,
    provider: Arc<dyn IpoProvider>,
    service_account: Option<String>,
    ttl: Duration,
}

impl IpoCacheService {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        provider: Arc<dyn IpoProvider>,
        service_account: Option<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            provider,
            service_account: service_account.filter(|s| !s.trim().is_empty()),
            ttl,
        }
    }

    /// Drop whatever a previous run left behind. Called once at startup.
    pub async fn init(&self) {
        self.clear().await;
        info!("🧹 IPO cache cleared on startup");
    }

    /// Cached listing, fetching it on a miss.
    ///
    /// Upstream failures degrade to an empty listing, which is not cached.
    pub async fn get_ipos(&self) -> IpoList {
        if let Some(cached) = self.cached().await {
            debug!("IPO cache hit ({} entries)", cached.len());
            return cached;
        }

        match self.fetch_from_upstream().await {
            Ok(Some(ipos)) => {
                self.store(&ipos).await;
                ipos
            }
            Ok(None) => IpoList::empty(),
            Err(e) => {
                error!("Failed to fetch IPOs from upstream: {}", e);
                IpoList::empty()
            }
        }
    }

    /// Replace the cached listing with a fresh one regardless of its age.
    ///
    /// Returns the number of IPOs now cached. Generic upstream errors are
    /// returned so the calling job is marked failed; the entry stays cleared.
    pub async fn refresh(&self) -> Result<usize, AppError> {
        info!("🔄 Refreshing IPOs from upstream...");
        self.clear().await;

        match self.fetch_from_upstream().await {
            Ok(Some(ipos)) => {
                self.store(&ipos).await;
                info!("✅ Cached {} IPOs", ipos.len());
                Ok(ipos.len())
            }
            Ok(None) => Ok(0),
            Err(e) => Err(AppError::External(format!("IPO refresh failed: {}", e))),
        }
    }

    pub async fn ipos_with_status(&self, status: &str) -> Vec<IpoData> {
        self.get_ipos().await.with_status(status)
    }

    /// Ongoing IPOs whose closing date falls within `[from, to]`.
    pub async fn ipos_closing_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<IpoData> {
        self.ipos_with_status("ongoing")
            .await
            .into_iter()
            .filter(|ipo| ipo.closes_between(from, to))
            .collect()
    }

    /// One upstream fetch with a single retry on an expired credential.
    ///
    /// `Ok(None)` means the fetch was given up on: no service account is
    /// configured, or the credential was still rejected after the retry.
    pub async fn fetch_from_upstream(&self) -> Result<Option<IpoList>, IpoProviderError> {
        let Some(account) = self.service_account.as_deref() else {
            error!("Internal trading user not set, cannot fetch IPOs");
            return Ok(None);
        };

        match self.provider.fetch_ipos(account).await {
            Ok(ipos) => Ok(Some(ipos)),
            Err(IpoProviderError::CredentialExpired(_)) => {
                info!("🔑 Credential expired for {}, retrying once...", account);
                match self.provider.fetch_ipos(account).await {
                    Ok(ipos) => Ok(Some(ipos)),
                    Err(IpoProviderError::CredentialExpired(_)) => {
                        error!("Failed to retrieve IPOs after refreshing credential for {}", account);
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn cached(&self) -> Option<IpoList> {
        let raw = match self.cache.get(IPO_CACHE_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                error!("Error while reading IPOs from cache: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(ipos) => Some(ipos),
            Err(e) => {
                warn!("Discarding unreadable IPO cache entry: {}", e);
                None
            }
        }
    }

    async fn store(&self, ipos: &IpoList) {
        let raw = match serde_json::to_string(ipos) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Error while serializing IPOs for cache: {}", e);
                return;
            }
        };

        match self.cache.set(IPO_CACHE_KEY, raw, self.ttl).await {
            Ok(()) => debug!("Cached {} IPOs under {}", ipos.len(), IPO_CACHE_KEY),
            Err(e) => error!("Error while caching IPOs: {}", e),
        }
    }

    async fn clear(&self) {
        if let Err(e) = self.cache.delete(IPO_CACHE_KEY).await {
            error!("Error while clearing IPO cache: {}", e);
        }
    }
}
