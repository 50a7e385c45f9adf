use std::str::FromStr;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Console line layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Full,
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(LogFormat::Full),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("Unknown LOG_FORMAT '{}' (expected 'full' or 'compact')", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
    pub format: Result<LogFormat, String>,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            loki_enabled: std::env::var("LOKI_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            loki_url: std::env::var("LOKI_URL").ok(),
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "vest-scheduler".to_string()),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            log_level: std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,sqlx=warn".to_string()),
            format: std::env::var("LOG_FORMAT")
                .map(|raw| raw.parse())
                .unwrap_or(Ok(LogFormat::Full)),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.loki_enabled && self.loki_url.is_none() {
            return Err("LOKI_ENABLED is true but LOKI_URL is not set".to_string());
        }
        if let Err(e) = &self.format {
            return Err(e.clone());
        }
        EnvFilter::try_new(&self.log_level)
            .map_err(|e| format!("RUST_LOG '{}' is not a valid filter: {}", self.log_level, e))?;
        Ok(())
    }

    fn log_format(&self) -> LogFormat {
        self.format.clone().unwrap_or(LogFormat::Full)
    }
}

/// Install the global subscriber. Must be called from inside the runtime
/// when Loki shipping is enabled.
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    #[cfg(feature = "loki")]
    {
        if config.loki_enabled {
            if let Some(loki_url) = config.loki_url.clone() {
                return init_with_loki(config, &loki_url);
            }
        }
    }

    init_console_only(config)
}

fn init_console_only(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let format = config.log_format();

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level)?)
        .with((format == LogFormat::Full).then(fmt::layer))
        .with((format == LogFormat::Compact).then(|| fmt::layer().compact()))
        .try_init()?;

    tracing::info!(
        "📊 Console logging initialized for {} ({})",
        config.service_name,
        config.environment
    );
    Ok(())
}

#[cfg(feature = "loki")]
fn init_with_loki(config: LoggingConfig, loki_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let url = url::Url::parse(loki_url)?;

    let (loki_layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)?
        .label("environment", &config.environment)?
        .build_url(url)?;

    // Ships buffered events to Loki in the background
    tokio::spawn(task);

    let format = config.log_format();

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level)?)
        .with((format == LogFormat::Full).then(fmt::layer))
        .with((format == LogFormat::Compact).then(|| fmt::layer().compact()))
        .with(loki_layer)
        .try_init()?;

    tracing::info!("✅ Loki logging initialized at {}", loki_url);
    Ok(())
}
