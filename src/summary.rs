//! Summary / diff engine
//!
//! Latest-vs-previous comparison per item and per-item series for charting.
//! Read-only over a [`HistoryTable`].

use serde::Serialize;

use crate::types::HistoryTable;

/// Derived comparison for one item, never persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub item: String,
    pub latest: f64,
    pub previous: f64,
    pub diff: f64,
    pub pct_change: f64,
}

impl SummaryRow {
    fn new(item: &str, latest: f64, previous: f64) -> Self {
        let diff = latest - previous;
        Self {
            item: item.to_string(),
            latest,
            previous,
            diff,
            pct_change: pct_change(diff, previous),
        }
    }

    /// Percentage change as shown on the dashboard, e.g. `"50.00%"`.
    pub fn pct_display(&self) -> String {
        format!("{:.2}%", self.pct_change)
    }
}

/// A zero previous value yields 0% rather than an infinite change.
pub fn pct_change(diff: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        diff / previous * 100.0
    }
}

/// Compare the two most recent rows for every column the latest row defines.
///
/// With a single row (or a blank previous cell) the previous value is the
/// latest one, so diff and change are zero. An empty table has no summary.
pub fn summarize(table: &HistoryTable) -> Vec<SummaryRow> {
    let Some(latest) = table.latest() else {
        return Vec::new();
    };
    let previous = table
        .rows
        .len()
        .checked_sub(2)
        .and_then(|i| table.rows.get(i));

    table
        .columns
        .iter()
        .filter_map(|column| {
            let current = latest.get(column)?;
            let prior = previous.and_then(|row| row.get(column)).unwrap_or(current);
            Some(SummaryRow::new(column, current, prior))
        })
        .collect()
}

/// Timestamp of the most recent row
pub fn last_updated(table: &HistoryTable) -> Option<&str> {
    table.latest().map(|row| row.timestamp.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest first, for charts
    #[default]
    Ascending,
    /// Newest first, for raw-data listings
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: String,
    pub value: f64,
}

/// Full history of one item; blank cells are skipped.
pub fn series(table: &HistoryTable, item: &str, order: SortOrder) -> Vec<SeriesPoint> {
    let mut points: Vec<SeriesPoint> = table
        .rows
        .iter()
        .filter_map(|row| {
            row.get(item).map(|value| SeriesPoint {
                timestamp: row.timestamp.clone(),
                value,
            })
        })
        .collect();

    // The fixed timestamp format sorts lexicographically.
    points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    if order == SortOrder::Descending {
        points.reverse();
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HistoryRow;

    fn table(rows: Vec<HistoryRow>) -> HistoryTable {
        let mut table = HistoryTable::new();
        for row in rows {
            table.push(row);
        }
        table
    }

    #[test]
    fn diff_and_percentage_between_last_two_rows() {
        let t = table(vec![
            HistoryRow::new("2026-01-01 08:00:00").with("A", 10.0),
            HistoryRow::new("2026-01-02 08:00:00").with("A", 15.0),
        ]);
        let summary = summarize(&t);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].previous, 10.0);
        assert_eq!(format!("{:.2}", summary[0].diff), "5.00");
        assert_eq!(summary[0].pct_display(), "50.00%");
    }

    #[test]
    fn zero_previous_reports_zero_percent() {
        let t = table(vec![
            HistoryRow::new("2026-01-01 08:00:00").with("A", 0.0),
            HistoryRow::new("2026-01-02 08:00:00").with("A", 5.0),
        ]);
        let summary = summarize(&t);
        assert_eq!(summary[0].diff, 5.0);
        assert_eq!(summary[0].pct_display(), "0.00%");
    }

    #[test]
    fn single_row_compares_against_itself() {
        let t = table(vec![HistoryRow::new("2026-01-01 08:00:00").with("A", 42.0)]);
        let summary = summarize(&t);
        assert_eq!(summary[0].latest, 42.0);
        assert_eq!(summary[0].previous, 42.0);
        assert_eq!(summary[0].diff, 0.0);
        assert_eq!(summary[0].pct_display(), "0.00%");
    }

    #[test]
    fn only_columns_present_in_latest_row_in_column_order() {
        let t = table(vec![
            HistoryRow::new("t1").with("Old", 1.0).with("B", 2.0),
            HistoryRow::new("t2").with("B", 3.0).with("New", 7.0),
        ]);
        let items: Vec<String> = summarize(&t).into_iter().map(|r| r.item).collect();
        assert_eq!(items, vec!["B", "New"]);

        let new = summarize(&t).into_iter().find(|r| r.item == "New").unwrap();
        assert_eq!(new.previous, 7.0, "blank previous cell falls back to latest");
    }

    #[test]
    fn negative_change() {
        let t = table(vec![
            HistoryRow::new("t1").with("A", 20.0),
            HistoryRow::new("t2").with("A", 15.0),
        ]);
        assert_eq!(summarize(&t)[0].pct_display(), "-25.00%");
    }

    #[test]
    fn empty_table_has_no_summary() {
        assert!(summarize(&HistoryTable::new()).is_empty());
        assert_eq!(last_updated(&HistoryTable::new()), None);
    }

    #[test]
    fn series_sorted_both_ways_and_skips_blanks() {
        let t = table(vec![
            HistoryRow::new("2026-01-02 08:00:00").with("A", 2.0),
            HistoryRow::new("2026-01-01 08:00:00").with("A", 1.0),
            HistoryRow::new("2026-01-03 08:00:00").with("B", 9.0),
            HistoryRow::new("2026-01-04 08:00:00").with("A", 4.0),
        ]);

        let asc: Vec<f64> = series(&t, "A", SortOrder::Ascending)
            .iter()
            .map(|p| p.value)
            .collect();
        assert_eq!(asc, vec![1.0, 2.0, 4.0]);

        let desc = series(&t, "A", SortOrder::Descending);
        assert_eq!(desc[0].timestamp, "2026-01-04 08:00:00");
        assert_eq!(desc.len(), 3);

        assert!(series(&t, "Missing", SortOrder::Ascending).is_empty());
        assert_eq!(last_updated(&t), Some("2026-01-04 08:00:00"));
    }
}
