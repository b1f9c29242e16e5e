//! Economic-series provider client
//!
//! Items whose source hint points at the economic-data provider carry the
//! series id as the last path segment of the URL. The latest observation is
//! read from the provider's CSV export over a short look-back window.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use csv::ReaderBuilder;
use tracing::debug;

use super::ValueSource;
use crate::error::{MonitorError, Result};
use crate::types::{round2, MonitoringItem, Tier};

const PROVIDER: &str = "economic";

/// Extract the series id from a provider URL such as
/// `https://fred.stlouisfed.org/series/DGS10?utm=x`.
pub fn series_id_from_hint(hint: &str) -> Result<String> {
    let without_query = hint.split(['?', '#']).next().unwrap_or_default();
    let id = without_query
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    let looks_like_host = id.contains('.') || id.contains(':');
    if id.is_empty() || looks_like_host {
        return Err(MonitorError::ParseFailure(format!(
            "no series id in hint '{}'",
            hint
        )));
    }
    Ok(id.to_string())
}

/// Economic-series tier
#[derive(Debug, Clone)]
pub struct EconomicSeriesSource {
    client: reqwest::Client,
    base_url: String,
    domains: Vec<String>,
    lookback_days: i64,
}

impl EconomicSeriesSource {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        domains: Vec<String>,
        lookback_days: i64,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            domains: domains.into_iter().map(|d| d.to_lowercase()).collect(),
            lookback_days,
        }
    }

    fn covers(&self, hint: &str) -> bool {
        let hint = hint.to_lowercase();
        self.domains.iter().any(|d| hint.contains(d.as_str()))
    }

    /// Latest observation of a series within the look-back window
    pub async fn fetch_latest(&self, series_id: &str) -> Result<f64> {
        let start = (Utc::now() - Duration::days(self.lookback_days))
            .format("%Y-%m-%d")
            .to_string();
        let url = format!("{}/graph/fredgraph.csv", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("id", series_id), ("cosd", start.as_str())])
            .send()
            .await
            .map_err(|e| MonitorError::from_transport(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::missing(
                PROVIDER,
                format!("{} returned HTTP {}", series_id, status),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| MonitorError::from_transport(PROVIDER, e))?;

        latest_observation(&body)
            .map(round2)
            .ok_or_else(|| MonitorError::missing(PROVIDER, format!("no observations for {}", series_id)))
    }
}

/// Last numeric value of a `date,value` CSV; "." marks a missing day.
fn latest_observation(body: &str) -> Option<f64> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    reader
        .records()
        .filter_map(|r| r.ok())
        .filter_map(|r| r.get(1).and_then(|v| v.trim().parse::<f64>().ok()))
        .filter(|v| v.is_finite())
        .last()
}

#[async_trait]
impl ValueSource for EconomicSeriesSource {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn tier(&self) -> Tier {
        Tier::Economic
    }

    async fn resolve(&self, item: &MonitoringItem) -> Result<Option<f64>> {
        let Some(hint) = item.source_hint.as_deref().filter(|h| self.covers(h)) else {
            return Ok(None);
        };
        let series_id = series_id_from_hint(hint)?;
        debug!(item = %item.name, series = %series_id, "Fetching economic series");
        self.fetch_latest(&series_id).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_id_is_last_path_segment() {
        assert_eq!(
            series_id_from_hint("https://fred.stlouisfed.org/series/DGS10").unwrap(),
            "DGS10"
        );
        assert_eq!(
            series_id_from_hint("https://fred.stlouisfed.org/series/T10Y2Y/?utm_source=x").unwrap(),
            "T10Y2Y"
        );
        assert_eq!(
            series_id_from_hint("fred.stlouisfed.org/series/BAMLH0A0HYM2#chart").unwrap(),
            "BAMLH0A0HYM2"
        );
    }

    #[test]
    fn bare_domain_hint_is_malformed() {
        let err = series_id_from_hint("https://fred.stlouisfed.org/").unwrap_err();
        assert!(matches!(err, MonitorError::ParseFailure(_)));
    }

    #[test]
    fn latest_observation_skips_missing_days() {
        let body = "observation_date,DGS10\n2026-01-05,4.18\n2026-01-06,4.21\n2026-01-07,.\n";
        assert_eq!(latest_observation(body), Some(4.21));
    }

    #[test]
    fn header_only_export_has_no_observation() {
        assert_eq!(latest_observation("observation_date,DGS10\n"), None);
    }

    #[tokio::test]
    async fn items_without_provider_hint_are_not_covered() {
        let source = EconomicSeriesSource::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            vec!["fred.stlouisfed.org".to_string()],
            10,
        );
        let item = MonitoringItem::with_hint("Gold", "https://example.com/gold");
        assert_eq!(source.resolve(&item).await.unwrap(), None);
        assert_eq!(source.resolve(&MonitoringItem::new("Gold")).await.unwrap(), None);
    }
}
