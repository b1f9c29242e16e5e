//! Resolution chain - tries tiers in order for every monitored item
//!
//! Each item walks the ordered list of live sources until one yields a value;
//! otherwise it lands on the simulated fallback, which cannot fail. A shared
//! pacer spaces item resolutions to respect upstream rate limits.

use anyhow::{Context, Result};
use futures_util::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::sources::{EconomicSeriesSource, QuoteSource, SimulatedSource, ValueSource};
use crate::config::AppConfig;
use crate::error::MonitorError;
use crate::types::{HistoryRow, MonitoringItem, ResolvedValue, Tier};

const USER_AGENT: &str = concat!("marketwatch/", env!("CARGO_PKG_VERSION"));

/// Enforces a minimum spacing between successive calls to `ready`.
///
/// Shared by all concurrently resolving items, so it doubles as the
/// per-run rate limiter.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    pub async fn ready(&self) {
        if self.interval.is_zero() {
            return;
        }
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            tokio::time::sleep_until(prev + self.interval).await;
        }
        *last = Some(Instant::now());
    }
}

/// Ordered resolution strategies plus the infallible fallback
pub struct ResolverChain {
    sources: Vec<Box<dyn ValueSource>>,
    fallback: SimulatedSource,
    pacer: Pacer,
    max_concurrency: usize,
}

impl ResolverChain {
    pub fn new(sources: Vec<Box<dyn ValueSource>>, item_delay: Duration) -> Self {
        Self {
            sources,
            fallback: SimulatedSource::new(),
            pacer: Pacer::new(item_delay),
            max_concurrency: 1,
        }
    }

    /// Resolve up to `n` items at once. Output order is unaffected.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }

    /// Standard chain: quote provider, economic series, simulation.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let resolver = &config.resolver;
        let mut sources: Vec<Box<dyn ValueSource>> = Vec::new();

        if resolver.live_enabled {
            let client = reqwest::Client::builder()
                .timeout(config.request_timeout())
                .user_agent(USER_AGENT)
                .build()
                .context("Failed to build HTTP client")?;

            sources.push(Box::new(QuoteSource::new(
                client.clone(),
                resolver.quote_base_url.clone(),
            )));
            sources.push(Box::new(EconomicSeriesSource::new(
                client,
                resolver.economic_base_url.clone(),
                resolver.economic_domains.clone(),
                resolver.economic_lookback_days,
            )));
        }

        Ok(Self::new(sources, config.item_delay()).with_concurrency(resolver.max_concurrency))
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Walk the live tiers only.
    ///
    /// `Ok(None)` when every tier is absent or failed at the provider level;
    /// `Err` for anything else, which callers treat as "simulate this item".
    pub async fn resolve_live(
        &self,
        item: &MonitoringItem,
    ) -> std::result::Result<Option<ResolvedValue>, MonitorError> {
        for source in &self.sources {
            match source.resolve(item).await {
                Ok(Some(value)) => {
                    return Ok(Some(ResolvedValue {
                        value: Some(value),
                        tier: source.tier(),
                    }))
                }
                Ok(None) => {}
                Err(e) if e.is_provider() => {
                    debug!(item = %item.name, source = source.name(), error = %e, "Provider unavailable");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Resolve one item; never fails.
    pub async fn resolve_item(&self, item: &MonitoringItem) -> ResolvedValue {
        if !self.sources.is_empty() {
            self.pacer.ready().await;
        }

        match self.resolve_live(item).await {
            Ok(Some(resolved)) => return resolved,
            Ok(None) => {}
            Err(e) => {
                warn!(item = %item.name, error = %e, "Resolution failed, using simulated value");
            }
        }

        ResolvedValue {
            value: Some(self.fallback.generate(item)),
            tier: Tier::Simulated,
        }
    }

    /// Resolve every item into one history row, in list order.
    ///
    /// A name that appears twice is resolved once, at its first position.
    pub async fn resolve_all(&self, items: &[MonitoringItem], timestamp: &str) -> HistoryRow {
        let mut seen = HashSet::new();
        let unique: Vec<&MonitoringItem> = items
            .iter()
            .filter(|item| {
                let first = seen.insert(item.name.as_str());
                if !first {
                    warn!(item = %item.name, "Duplicate item skipped");
                }
                first
            })
            .collect();

        let resolved: Vec<(&MonitoringItem, ResolvedValue)> = stream::iter(unique)
            .map(|item| async move { (item, self.resolve_item(item).await) })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut row = HistoryRow::new(timestamp);
        let mut by_tier: HashMap<Tier, usize> = HashMap::new();
        for (item, resolved) in resolved {
            debug!(item = %item.name, value = ?resolved.value, tier = %resolved.tier, "Resolved");
            *by_tier.entry(resolved.tier).or_default() += 1;
            row.insert(item.name.clone(), resolved.value);
        }

        info!(
            timestamp,
            items = row.len(),
            live = by_tier.get(&Tier::Live).copied().unwrap_or(0),
            economic = by_tier.get(&Tier::Economic).copied().unwrap_or(0),
            simulated = by_tier.get(&Tier::Simulated).copied().unwrap_or(0),
            "Resolution pass complete"
        );
        row
    }
}
