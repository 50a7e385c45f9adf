use async_trait::async_trait;
use thiserror::Error;

use crate::models::IpoList;

#[derive(Debug, Error)]
pub enum IpoProviderError {
    /// The session credential for the account was rejected. A fresh one has
    /// been requested, so an immediate retry may succeed.
    #[error("credential expired for account {0}")]
    CredentialExpired(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),
}

#[async_trait]
pub trait IpoProvider: Send + Sync {
    /// Current IPO listings, fetched on behalf of `account_id`.
    async fn fetch_ipos(&self, account_id: &str) -> Result<IpoList, IpoProviderError>;
}
