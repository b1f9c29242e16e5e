//! Dashboard Module
//!
//! Read-only HTTP API over the history file: last-updated time, summary
//! table, and per-item or all-items trend series.
//! Only compiled when the `dashboard` feature is enabled.

mod api;
mod types;

pub use api::{create_router, serve};
pub use types::*;

use std::sync::Arc;

use crate::error::Result;
use crate::persistence::HistoryStore;
use crate::summary::{last_updated, series, summarize, SortOrder};
use crate::types::HistoryTable;

/// Builds dashboard views from the history store without mutating it
#[derive(Debug, Clone)]
pub struct DashboardReader {
    store: Arc<HistoryStore>,
}

impl DashboardReader {
    pub fn new(store: Arc<HistoryStore>) -> Self {
        Self { store }
    }

    fn table(&self) -> Result<Option<HistoryTable>> {
        self.store.read()
    }

    pub fn summary(&self) -> Result<SummaryResponse> {
        let Some(table) = self.table()? else {
            return Ok(SummaryResponse::not_yet_run());
        };
        Ok(SummaryResponse {
            status: DataStatus::Ok,
            last_updated: last_updated(&table).map(str::to_string),
            items: summarize(&table).into_iter().map(Into::into).collect(),
        })
    }

    /// Series for one item, or every column when `item` is `None`.
    pub fn history(&self, item: Option<&str>, order: SortOrder) -> Result<HistoryResponse> {
        let Some(table) = self.table()? else {
            return Ok(HistoryResponse {
                status: DataStatus::NotYetRun,
                series: Vec::new(),
            });
        };

        let items: Vec<&str> = match item {
            Some(item) => vec![item],
            None => table.columns.iter().map(String::as_str).collect(),
        };
        let series = items
            .into_iter()
            .map(|name| SeriesResponse {
                item: name.to_string(),
                points: series(&table, name, order)
                    .into_iter()
                    .map(Into::into)
                    .collect(),
            })
            .collect();

        Ok(HistoryResponse {
            status: DataStatus::Ok,
            series,
        })
    }
}
