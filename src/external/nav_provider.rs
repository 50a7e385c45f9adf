use async_trait::async_trait;
use thiserror::Error;

use crate::models::MutualFundNav;

#[derive(Debug, Error)]
pub enum NavProviderError {
    #[error("no NAV published for {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),
}

#[async_trait]
pub trait NavProvider: Send + Sync {
    /// Latest NAV for a fund.
    ///
    /// `Ok(None)` means the upstream answered but the payload lacked either the
    /// current or the previous NAV.
    async fn fetch_nav(&self, isin: &str) -> Result<Option<MutualFundNav>, NavProviderError>;
}
