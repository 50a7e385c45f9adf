use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{AUTHORIZATION, COOKIE};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::external::ipo_provider::{IpoProvider, IpoProviderError};
use crate::models::IpoList;

pub const DEFAULT_KITE_OMS_BASE_URL: &str = "https://kite.zerodha.com/oms";
const IPO_PATH: &str = "/ipo";

/// Issues session tokens (`enctoken`) for trading accounts.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn issue_token(&self, account_id: &str) -> Result<String, IpoProviderError>;
}

/// Hands out the one token configured through `KITE_ENC_TOKEN`.
pub struct StaticCredentialSource {
    token: Option<String>,
}

impl StaticCredentialSource {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn issue_token(&self, account_id: &str) -> Result<String, IpoProviderError> {
        self.token.clone().ok_or_else(|| {
            IpoProviderError::BadResponse(format!(
                "KITE_ENC_TOKEN not set, cannot authenticate {}",
                account_id
            ))
        })
    }
}

/// Client for the broker's internal OMS API.
///
/// Tokens are cached per account. A 403 drops the cached token, asks the
/// credential source for a new one and reports `CredentialExpired` so the
/// caller can decide whether to retry.
pub struct KiteInternalProvider {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialSource>,
    tokens: RwLock<HashMap<String, String>>,
}

impl KiteInternalProvider {
    pub fn new(
        base_url: &str,
        credentials: Arc<dyn CredentialSource>,
        timeout: Duration,
    ) -> Result<Self, IpoProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IpoProviderError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            tokens: RwLock::new(HashMap::new()),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn token_for(&self, account_id: &str) -> Result<String, IpoProviderError> {
        let cached = self.tokens.read().get(account_id).cloned();
        if let Some(token) = cached {
            return Ok(token);
        }

        info!("🔑 No session token cached for {}, requesting one", account_id);
        let token = self.credentials.issue_token(account_id).await?;
        self.tokens
            .write()
            .insert(account_id.to_string(), token.clone());
        Ok(token)
    }

    async fn refresh_token(&self, account_id: &str) {
        self.tokens.write().remove(account_id);
        match self.credentials.issue_token(account_id).await {
            Ok(token) => {
                self.tokens.write().insert(account_id.to_string(), token);
                info!("🔑 Session token refreshed for {}", account_id);
            }
            Err(e) => warn!("Could not refresh session token for {}: {}", account_id, e),
        }
    }
}

#[async_trait]
impl IpoProvider for KiteInternalProvider {
    async fn fetch_ipos(&self, account_id: &str) -> Result<IpoList, IpoProviderError> {
        let token = self.token_for(account_id).await?;
        let url = self.endpoint(IPO_PATH);
        debug!("Fetching IPOs from {}", url);

        let resp = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("enctoken {}", token))
            .header(COOKIE, format!("enctoken={}", token))
            .send()
            .await
            .map_err(|e| IpoProviderError::Network(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::FORBIDDEN {
            warn!("403 Forbidden: session token expired for account {}", account_id);
            self.refresh_token(account_id).await;
            return Err(IpoProviderError::CredentialExpired(account_id.to_string()));
        }
        if !status.is_success() {
            return Err(IpoProviderError::BadResponse(format!(
                "IPO endpoint returned HTTP {}",
                status
            )));
        }

        resp.json::<IpoList>()
            .await
            .map_err(|e| IpoProviderError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        issued: AtomicUsize,
    }

    #[async_trait]
    impl CredentialSource for CountingSource {
        async fn issue_token(&self, _account_id: &str) -> Result<String, IpoProviderError> {
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("token-{}", n))
        }
    }

    fn provider(source: Arc<CountingSource>) -> KiteInternalProvider {
        KiteInternalProvider::new("https://oms.example.test/oms/", source, Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let p = provider(Arc::new(CountingSource { issued: AtomicUsize::new(0) }));
        assert_eq!(p.endpoint(IPO_PATH), "https://oms.example.test/oms/ipo");
    }

    #[tokio::test]
    async fn test_token_is_cached_until_refreshed() {
        let source = Arc::new(CountingSource { issued: AtomicUsize::new(0) });
        let p = provider(source.clone());

        assert_eq!(p.token_for("AB1234").await.unwrap(), "token-1");
        assert_eq!(p.token_for("AB1234").await.unwrap(), "token-1");
        assert_eq!(source.issued.load(Ordering::SeqCst), 1);

        p.refresh_token("AB1234").await;
        assert_eq!(p.token_for("AB1234").await.unwrap(), "token-2");
        assert_eq!(source.issued.load(Ordering::SeqCst), 2);
    }
}
