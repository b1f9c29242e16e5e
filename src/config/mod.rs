//! Configuration management for MarketWatch
//!
//! Loads from optional config files + environment variables via .env

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub resolver: ResolverConfig,
    pub persistence: PersistenceConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// CSV file listing the items to monitor
    pub list_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Try the quote and economic-series providers before simulating
    pub live_enabled: bool,
    /// Per-request timeout for every upstream fetch
    pub request_timeout_secs: u64,
    /// Minimum spacing between item resolutions in milliseconds
    pub item_delay_ms: u64,
    /// Items resolved at once (1 = sequential)
    pub max_concurrency: usize,
    /// Quote provider base URL (chart API)
    pub quote_base_url: String,
    /// Economic-series provider base URL (CSV graph export)
    pub economic_base_url: String,
    /// Hint domains routed to the economic-series provider
    pub economic_domains: Vec<String>,
    /// Look-back window for economic observations in days
    pub economic_lookback_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// Data directory
    pub data_dir: String,
    /// History CSV file name inside data_dir
    pub history_file: String,
    /// Offset of the civil time written to the Timestamp column
    pub utc_offset_hours: i32,
    /// Age after which an abandoned lock file is reclaimed
    pub lock_stale_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Bind address for the dashboard API
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Self::builder()?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (MARKETWATCH__*)
            .add_source(
                Environment::with_prefix("MARKETWATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("resolver.economic_domains")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        app_config.validate()?;

        Ok(app_config)
    }

    /// Built-in defaults only, no files or environment
    pub fn defaults() -> Result<Self> {
        let config = Self::builder()?
            .build()
            .context("Failed to build configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            // Monitor defaults
            .set_default("monitor.list_path", "monitoring_list.csv")?
            // Resolver defaults
            .set_default("resolver.live_enabled", true)?
            .set_default("resolver.request_timeout_secs", 10)?
            .set_default("resolver.item_delay_ms", 500)?
            .set_default("resolver.max_concurrency", 1)?
            .set_default(
                "resolver.quote_base_url",
                "https://query1.finance.yahoo.com",
            )?
            .set_default("resolver.economic_base_url", "https://fred.stlouisfed.org")?
            .set_default("resolver.economic_domains", vec!["fred.stlouisfed.org"])?
            .set_default("resolver.economic_lookback_days", 10)?
            // Persistence defaults
            .set_default("persistence.data_dir", ".")?
            .set_default("persistence.history_file", "history_data.csv")?
            .set_default("persistence.utc_offset_hours", 8)?
            .set_default("persistence.lock_stale_secs", 300)?
            // Dashboard defaults
            .set_default("dashboard.bind", "127.0.0.1:8501")?
            // Logging defaults
            .set_default("logging.format", "pretty")?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolver.max_concurrency == 0 {
            bail!("resolver.max_concurrency must be at least 1");
        }
        if self.resolver.request_timeout_secs == 0 {
            bail!("resolver.request_timeout_secs must be positive");
        }
        if !(1..=3650).contains(&self.resolver.economic_lookback_days) {
            bail!(
                "resolver.economic_lookback_days {} must be between 1 and 3650",
                self.resolver.economic_lookback_days
            );
        }
        if !(-12..=14).contains(&self.persistence.utc_offset_hours) {
            bail!(
                "persistence.utc_offset_hours {} is out of range",
                self.persistence.utc_offset_hours
            );
        }
        if self.persistence.history_file.trim().is_empty() {
            bail!("persistence.history_file must not be empty");
        }
        Ok(())
    }

    /// Full path of the history CSV
    pub fn history_path(&self) -> PathBuf {
        PathBuf::from(&self.persistence.data_dir).join(&self.persistence.history_file)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.resolver.request_timeout_secs)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.resolver.item_delay_ms)
    }

    /// Generate a digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "list={} history={} live={} timeout={}s delay={}ms concurrency={}",
            self.monitor.list_path,
            self.history_path().display(),
            self.resolver.live_enabled,
            self.resolver.request_timeout_secs,
            self.resolver.item_delay_ms,
            self.resolver.max_concurrency
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
