//! MarketWatch - Main Entry Point
//!
//! Usage:
//!   marketwatch [run]      resolve every monitored item once and append a row
//!   marketwatch dashboard  serve the dashboard API (feature `dashboard`)
//!
//! Scheduling is left to cron/systemd timers.

use anyhow::{bail, Result};
use marketwatch::config::{AppConfig, LoggingConfig};
use marketwatch::pipeline;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging);

    let command = std::env::args().nth(1).unwrap_or_else(|| "run".to_string());
    match command.as_str() {
        "run" => {
            let report = pipeline::run_once(&config).await?;
            info!(
                "✅ {} items recorded at {} ({} rows total)",
                report.items, report.timestamp, report.total_rows
            );
            Ok(())
        }
        "dashboard" => serve_dashboard(&config).await,
        other => bail!("Unknown command '{}' (expected 'run' or 'dashboard')", other),
    }
}

#[cfg(feature = "dashboard")]
async fn serve_dashboard(config: &AppConfig) -> Result<()> {
    use marketwatch::dashboard::{serve, DashboardReader};
    use marketwatch::persistence::HistoryStore;
    use std::sync::Arc;

    let store = Arc::new(HistoryStore::from_config(config)?);
    serve(&config.dashboard.bind, Arc::new(DashboardReader::new(store))).await
}

#[cfg(not(feature = "dashboard"))]
async fn serve_dashboard(_config: &AppConfig) -> Result<()> {
    bail!("Built without the `dashboard` feature")
}
