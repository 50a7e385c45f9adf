use std::time::Duration;

use chrono_tz::Tz;

use crate::external::kite_internal::DEFAULT_KITE_OMS_BASE_URL;

const DEFAULT_POOL_SIZE: usize = 4;
const DEFAULT_CACHE_TTL_HOURS: u64 = 24;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_NOTIFICATION_TIME_ZONE: &str = "Asia/Kolkata";

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// Absent means the process-local cache is used.
    pub redis_url: Option<String>,
    /// NAV endpoint with an `{isin}` placeholder.
    pub mf_nav_api_url: String,
    pub kite_oms_base_url: String,
    pub kite_enc_token: Option<String>,
    /// Service account the IPO listing is fetched for.
    pub internal_trading_user: Option<String>,
    pub scheduler_pool_size: usize,
    pub cache_ttl: Duration,
    pub http_timeout: Duration,
    pub notification_time_zone: String,
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match optional(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} must be a positive number, got '{}'", name, raw)),
        None => Ok(default),
    }
}

fn ttl_from_hours(hours: u64) -> Result<Duration, String> {
    hours
        .checked_mul(60 * 60)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("CACHE_TTL_HOURS is too large, got {}", hours))
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url = optional("DATABASE_URL").ok_or("DATABASE_URL is not set")?;
        let mf_nav_api_url = optional("MF_NAV_API_URL").ok_or("MF_NAV_API_URL is not set")?;

        Ok(Self {
            database_url,
            redis_url: optional("REDIS_URL"),
            mf_nav_api_url,
            kite_oms_base_url: optional("KITE_OMS_BASE_URL")
                .unwrap_or_else(|| DEFAULT_KITE_OMS_BASE_URL.to_string()),
            kite_enc_token: optional("KITE_ENC_TOKEN"),
            internal_trading_user: optional("INTERNAL_TRADING_USER"),
            scheduler_pool_size: parse_or("SCHEDULER_POOL_SIZE", DEFAULT_POOL_SIZE)?,
            cache_ttl: ttl_from_hours(parse_or("CACHE_TTL_HOURS", DEFAULT_CACHE_TTL_HOURS)?)?,
            http_timeout: Duration::from_secs(parse_or(
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            notification_time_zone: optional("NOTIFICATION_TIME_ZONE")
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_TIME_ZONE.to_string()),
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.scheduler_pool_size == 0 {
            return Err("SCHEDULER_POOL_SIZE must be at least 1".to_string());
        }
        if self.cache_ttl.is_zero() {
            return Err("CACHE_TTL_HOURS must be at least 1".to_string());
        }
        if self.http_timeout.is_zero() {
            return Err("HTTP_TIMEOUT_SECS must be at least 1".to_string());
        }

        url::Url::parse(&self.kite_oms_base_url)
            .map_err(|e| format!("KITE_OMS_BASE_URL is not a valid URL: {}", e))?;
        if let Some(redis_url) = &self.redis_url {
            url::Url::parse(redis_url).map_err(|e| format!("REDIS_URL is not a valid URL: {}", e))?;
        }
        if !self.mf_nav_api_url.contains("{isin}") {
            return Err("MF_NAV_API_URL must contain an {isin} placeholder".to_string());
        }

        self.notification_tz()?;
        Ok(())
    }

    pub fn notification_tz(&self) -> Result<Tz, String> {
        self.notification_time_zone.parse().map_err(|_| {
            format!(
                "NOTIFICATION_TIME_ZONE '{}' is not a known time zone",
                self.notification_time_zone
            )
        })
    }
}
