//! End-to-end tests for the collection pipeline

#[cfg(test)]
mod tests {
    use marketwatch::config::AppConfig;
    use marketwatch::persistence::HistoryStore;
    use marketwatch::pipeline::{collect, run_once};
    use marketwatch::resolver::{classify, ResolverChain};
    use marketwatch::summary::{series, summarize, SortOrder};
    use marketwatch::types::MonitoringItem;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    fn offline_config(dir: &Path, list: &str) -> AppConfig {
        let list_path = dir.join("monitoring_list.csv");
        fs::write(&list_path, list).unwrap();

        let mut config = AppConfig::defaults().unwrap();
        config.monitor.list_path = list_path.to_string_lossy().into_owned();
        config.persistence.data_dir = dir.to_string_lossy().into_owned();
        config.resolver.live_enabled = false;
        config.resolver.item_delay_ms = 0;
        config
    }

    // ============================================================================
    // Full runs (live providers disabled)
    // ============================================================================

    #[tokio::test]
    async fn test_yield_item_is_simulated_in_rate_band() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path(), "ItemName\nUS 10Y Yield\n");

        let report = run_once(&config).await.unwrap();
        assert_eq!(report.items, 1);
        assert_eq!(report.total_rows, 1);

        let table = HistoryStore::new(config.history_path()).load_all().unwrap();
        let value = table.rows[0].get("US 10Y Yield").unwrap();
        assert!((1.5..=5.5).contains(&value), "value {} outside rate band", value);
    }

    #[tokio::test]
    async fn test_repeated_runs_grow_history_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path(), "ItemName,URL\nVIX,\nFear Greed,\nGold,\n");

        for _ in 0..3 {
            run_once(&config).await.unwrap();
        }

        let table = HistoryStore::new(config.history_path()).load_all().unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.columns, vec!["VIX", "Fear Greed", "Gold"]);

        let summary = summarize(&table);
        assert_eq!(summary.len(), 3);
        for row in &summary {
            let (low, high) = classify(&row.item).range();
            assert!(row.latest >= low && row.latest <= high);
            assert!((row.diff - (row.latest - row.previous)).abs() < 1e-9);
        }

        assert_eq!(series(&table, "Gold", SortOrder::Ascending).len(), 3);
    }

    #[tokio::test]
    async fn test_list_change_adds_column_without_losing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path(), "ItemName\nVIX\n");
        run_once(&config).await.unwrap();

        fs::write(&config.monitor.list_path, "ItemName\nMOVE\nVIX\n").unwrap();
        let report = run_once(&config).await.unwrap();
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.total_columns, 2);

        let table = HistoryStore::new(config.history_path()).load_all().unwrap();
        assert_eq!(table.columns, vec!["VIX", "MOVE"]);
        assert_eq!(table.rows[0].get("MOVE"), None);
        assert!(table.rows[1].get("MOVE").is_some());
    }

    #[tokio::test]
    async fn test_collect_counts_duplicate_names_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history_data.csv"));
        let chain = ResolverChain::new(Vec::new(), Duration::ZERO);
        let items = vec![
            MonitoringItem::new("VIX"),
            MonitoringItem::new("Gold"),
            MonitoringItem::new("VIX"),
        ];

        let report = collect(&items, &chain, &store, "2026-05-01 09:30:00").await.unwrap();
        assert_eq!(report.items, 2);
        assert_eq!(report.total_columns, 2);

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with("Timestamp,VIX,Gold\n"));
    }

    // ============================================================================
    // Failure handling
    // ============================================================================

    #[tokio::test]
    async fn test_missing_list_fails_without_touching_history() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = offline_config(dir.path(), "ItemName\nVIX\n");
        run_once(&config).await.unwrap();
        let before = fs::read(config.history_path()).unwrap();

        config.monitor.list_path = dir.path().join("missing.csv").to_string_lossy().into_owned();
        assert!(run_once(&config).await.is_err());
        assert_eq!(fs::read(config.history_path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_empty_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path(), "ItemName\n");
        assert!(run_once(&config).await.is_err());
        assert!(!config.history_path().exists());
    }

    #[tokio::test]
    async fn test_corrupted_history_is_recovered_on_next_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path(), "ItemName\nVIX\n");
        fs::write(config.history_path(), "Timestamp,VIX\n2026-01-01 08:00:00,not-a-number\n").unwrap();

        let report = run_once(&config).await.unwrap();
        assert_eq!(report.total_rows, 1);

        let backup = dir.path().join("history_data.csv.bak");
        assert_eq!(
            fs::read_to_string(backup).unwrap(),
            "Timestamp,VIX\n2026-01-01 08:00:00,not-a-number\n"
        );
    }

    #[tokio::test]
    async fn test_collect_uses_given_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history_data.csv"));
        let chain = ResolverChain::new(Vec::new(), Duration::ZERO);
        let items = vec![MonitoringItem::new("SP500 PE"), MonitoringItem::new("Copper")];

        let report = collect(&items, &chain, &store, "2026-05-01 09:30:00").await.unwrap();
        assert_eq!(report.timestamp, "2026-05-01 09:30:00");

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with("Timestamp,SP500 PE,Copper\n2026-05-01 09:30:00,"));
    }
}
