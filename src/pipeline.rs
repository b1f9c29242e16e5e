//! One collection run: monitoring list -> resolver chain -> history store

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

use crate::config::AppConfig;
use crate::monitoring_list::load_monitoring_list;
use crate::persistence::HistoryStore;
use crate::resolver::ResolverChain;
use crate::types::{local_timestamp, MonitoringItem};

/// Outcome of a run, for logging and the CLI
#[derive(Debug, Clone)]
pub struct RunReport {
    pub timestamp: String,
    pub items: usize,
    pub total_rows: usize,
    pub total_columns: usize,
}

/// Resolve `items` and append the row to `store`.
pub async fn collect(
    items: &[MonitoringItem],
    chain: &ResolverChain,
    store: &HistoryStore,
    timestamp: &str,
) -> Result<RunReport> {
    let row = chain.resolve_all(items, timestamp).await;
    let resolved = row.len();
    let table = store
        .append(row)
        .await
        .with_context(|| format!("Failed to append to {}", store.path().display()))?;

    Ok(RunReport {
        timestamp: timestamp.to_string(),
        items: resolved,
        total_rows: table.len(),
        total_columns: table.columns.len(),
    })
}

/// Run the whole pipeline once with the given configuration.
///
/// A missing, malformed or empty monitoring list aborts the run before the
/// history file is touched.
pub async fn run_once(config: &AppConfig) -> Result<RunReport> {
    info!(config = %config, "Starting collection run");

    let items = load_monitoring_list(Path::new(&config.monitor.list_path))
        .with_context(|| format!("Failed to load monitoring list {}", config.monitor.list_path))?;
    if items.is_empty() {
        bail!("Monitoring list {} has no items", config.monitor.list_path);
    }

    let chain = ResolverChain::from_config(config)?;
    let store = HistoryStore::from_config(config).context("Failed to open history store")?;
    let timestamp = local_timestamp(config.persistence.utc_offset_hours);

    let report = collect(&items, &chain, &store, &timestamp).await?;
    info!(
        timestamp = %report.timestamp,
        items = report.items,
        rows = report.total_rows,
        columns = report.total_columns,
        "Collection run finished"
    );
    Ok(report)
}
