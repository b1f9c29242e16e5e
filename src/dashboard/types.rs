//! Dashboard API Types
//!
//! DTOs served to the dashboard frontend.

use serde::{Deserialize, Serialize};

use crate::summary::{SeriesPoint, SortOrder, SummaryRow};

/// Whether the history file has been written yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataStatus {
    Ok,
    NotYetRun,
}

/// Summary table plus last-updated timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub status: DataStatus,
    pub last_updated: Option<String>,
    pub items: Vec<SummaryItemResponse>,
}

impl SummaryResponse {
    pub fn not_yet_run() -> Self {
        Self {
            status: DataStatus::NotYetRun,
            last_updated: None,
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryItemResponse {
    pub item: String,
    pub latest: f64,
    pub previous: f64,
    pub diff: f64,
    pub pct_change: f64,
    /// e.g. "50.00%"
    pub pct_display: String,
}

impl From<SummaryRow> for SummaryItemResponse {
    fn from(row: SummaryRow) -> Self {
        let pct_display = row.pct_display();
        Self {
            item: row.item,
            latest: row.latest,
            previous: row.previous,
            diff: row.diff,
            pct_change: row.pct_change,
            pct_display,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesPointResponse {
    pub timestamp: String,
    pub value: f64,
}

impl From<SeriesPoint> for SeriesPointResponse {
    fn from(point: SeriesPoint) -> Self {
        Self {
            timestamp: point.timestamp,
            value: point.value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesResponse {
    pub item: String,
    pub points: Vec<SeriesPointResponse>,
}

/// One series (selected item) or every column (all-items view)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub status: DataStatus,
    pub series: Vec<SeriesResponse>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderParam {
    #[default]
    Asc,
    Desc,
}

impl From<OrderParam> for SortOrder {
    fn from(order: OrderParam) -> Self {
        match order {
            OrderParam::Asc => SortOrder::Ascending,
            OrderParam::Desc => SortOrder::Descending,
        }
    }
}

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
