use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::external::nav_provider::{NavProvider, NavProviderError};
use crate::models::MutualFundNav;

const ISIN_PLACEHOLDER: &str = "{isin}";

/// NAV lookups against an HTTP endpoint such as
/// `https://navs.example.com/api/funds/{isin}`.
///
/// The endpoint answers with a JSON array; only the first element is used.
pub struct MfNavApiProvider {
    client: reqwest::Client,
    url_template: String,
}

impl MfNavApiProvider {
    pub fn new(url_template: &str, timeout: Duration) -> Result<Self, NavProviderError> {
        if !url_template.contains(ISIN_PLACEHOLDER) {
            return Err(NavProviderError::BadResponse(format!(
                "NAV API url '{}' has no {} placeholder",
                url_template, ISIN_PLACEHOLDER
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NavProviderError::Network(e.to_string()))?;

        Ok(Self {
            client,
            url_template: url_template.to_string(),
        })
    }

    fn url_for(&self, isin: &str) -> String {
        self.url_template.replace(ISIN_PLACEHOLDER, isin)
    }
}

/// First complete entry of an API response, if any.
fn first_complete(entries: Vec<MutualFundNav>) -> Option<MutualFundNav> {
    entries.into_iter().next().filter(MutualFundNav::is_complete)
}

#[async_trait]
impl NavProvider for MfNavApiProvider {
    async fn fetch_nav(&self, isin: &str) -> Result<Option<MutualFundNav>, NavProviderError> {
        let resp = self
            .client
            .get(self.url_for(isin))
            .send()
            .await
            .map_err(|e| NavProviderError::Network(e.to_string()))?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Err(NavProviderError::NotFound(isin.to_string())),
            status if !status.is_success() => {
                return Err(NavProviderError::BadResponse(format!(
                    "NAV API returned HTTP {} for {}",
                    status, isin
                )))
            }
            _ => {}
        }

        let entries: Vec<MutualFundNav> = resp
            .json()
            .await
            .map_err(|e| NavProviderError::Parse(e.to_string()))?;

        Ok(first_complete(entries))
    }
}
