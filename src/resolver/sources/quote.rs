//! Quote provider client
//!
//! Maps item names to ticker symbols and reads the latest daily close from
//! the chart endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::ValueSource;
use crate::error::{MonitorError, Result};
use crate::types::{round2, MonitoringItem, Tier};

const PROVIDER: &str = "quote";

/// Substring rule mapping a normalised item name to a symbol
struct TickerRule {
    contains: &'static str,
    excludes: Option<&'static str>,
    symbol: &'static str,
}

/// Checked in order, first match wins.
const TICKER_RULES: &[TickerRule] = &[
    TickerRule {
        contains: "us 10y",
        excludes: None,
        symbol: "^TNX",
    },
    TickerRule {
        contains: "vix",
        excludes: None,
        symbol: "^VIX",
    },
    TickerRule {
        contains: "sp500",
        excludes: Some("pe"),
        symbol: "^GSPC",
    },
    TickerRule {
        contains: "nyse ad",
        excludes: None,
        symbol: "^NYAD",
    },
    TickerRule {
        contains: "move",
        excludes: None,
        symbol: "^MOVE",
    },
];

/// Ticker symbol for an item name, if one of the rules matches.
pub fn ticker_for(name: &str) -> Option<&'static str> {
    let normalized = name.to_lowercase().replace('_', " ");
    TICKER_RULES
        .iter()
        .find(|rule| {
            normalized.contains(rule.contains)
                && !rule.excludes.is_some_and(|ex| normalized.contains(ex))
        })
        .map(|rule| rule.symbol)
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartResponse {
    fn latest_close(&self) -> Option<f64> {
        self.chart
            .result
            .as_ref()?
            .first()?
            .indicators
            .quote
            .first()?
            .close
            .iter()
            .rev()
            .flatten()
            .copied()
            .find(|v| v.is_finite())
    }
}

/// Live quote tier
#[derive(Debug, Clone)]
pub struct QuoteSource {
    client: reqwest::Client,
    base_url: String,
}

impl QuoteSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Most recent daily close for a symbol
    pub async fn fetch_latest_close(&self, symbol: &str) -> Result<f64> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let response = self
            .client
            .get(&url)
            .query(&[("range", "5d"), ("interval", "1d")])
            .send()
            .await
            .map_err(|e| MonitorError::from_transport(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::missing(
                PROVIDER,
                format!("{} returned HTTP {}", symbol, status),
            ));
        }

        let chart: ChartResponse = response
            .json()
            .await
            .map_err(|e| MonitorError::from_transport(PROVIDER, e))?;

        chart
            .latest_close()
            .map(round2)
            .ok_or_else(|| MonitorError::missing(PROVIDER, format!("no close for {}", symbol)))
    }
}

#[async_trait]
impl ValueSource for QuoteSource {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn tier(&self) -> Tier {
        Tier::Live
    }

    async fn resolve(&self, item: &MonitoringItem) -> Result<Option<f64>> {
        let Some(symbol) = ticker_for(&item.name) else {
            return Ok(None);
        };
        debug!(item = %item.name, symbol, "Fetching quote");
        self.fetch_latest_close(symbol).await.map(Some)
    }
}
