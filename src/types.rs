//! Core types used throughout MarketWatch
//!
//! Monitored items, resolved values and the rows/tables of the history file.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed timestamp format of the history file.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Name of the first history column.
pub const TIMESTAMP_COLUMN: &str = "Timestamp";

/// One entry of the monitoring list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringItem {
    /// Display name, also the history column key
    pub name: String,
    /// URL or free-form note
    pub source_hint: Option<String>,
}

impl MonitoringItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_hint: None,
        }
    }

    pub fn with_hint(name: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_hint: Some(hint.into()),
        }
    }
}

/// Resolution tier that produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Live,
    Economic,
    Simulated,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Live => write!(f, "live"),
            Tier::Economic => write!(f, "economic"),
            Tier::Simulated => write!(f, "simulated"),
        }
    }
}

/// Value produced for one item in one run. The tier is never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedValue {
    pub value: Option<f64>,
    pub tier: Tier,
}

/// One timestamped snapshot of all monitored values.
///
/// Cells are kept in insertion order; an absent cell is an explicit `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HistoryRow {
    pub timestamp: String,
    values: Vec<(String, Option<f64>)>,
}

impl HistoryRow {
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            values: Vec::new(),
        }
    }

    /// Set a cell, replacing any previous value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: Option<f64>) {
        let name = name.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(cell) => cell.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, Some(value));
        self
    }

    /// Value of a cell; `None` when the column is absent or blank.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| *v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(n, _)| n.as_str())
    }

    pub fn cells(&self) -> &[(String, Option<f64>)] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered history in append order with its column set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryTable {
    pub columns: Vec<String>,
    pub rows: Vec<HistoryRow>,
}

impl HistoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn latest(&self) -> Option<&HistoryRow> {
        self.rows.last()
    }

    /// Append a row, extending the column set with any names it introduces.
    /// Existing columns keep their position; new ones go to the end.
    pub fn push(&mut self, row: HistoryRow) {
        for name in row.names() {
            if !self.columns.iter().any(|c| c == name) {
                self.columns.push(name.to_string());
            }
        }
        self.rows.push(row);
    }
}

/// Current civil time at the given UTC offset, in the history timestamp format.
pub fn local_timestamp(utc_offset_hours: i32) -> String {
    format_timestamp(Utc::now(), utc_offset_hours)
}

pub fn format_timestamp(at: DateTime<Utc>, utc_offset_hours: i32) -> String {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix());
    at.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string()
}

/// Round to 2 decimal places, the precision stored in history.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
