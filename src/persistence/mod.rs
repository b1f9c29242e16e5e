//! CSV History Store
//!
//! Owns the append-only history table: one `Timestamp` column followed by one
//! column per monitored item. Columns may appear over time; cells a row does
//! not define stay blank. Every append rewrites the table through a temp file
//! and a rename, so an interrupted run leaves either the old or the new table.

use chrono::Utc;
use csv::{ReaderBuilder, WriterBuilder};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{MonitorError, Result};
use crate::types::{HistoryRow, HistoryTable, TIMESTAMP_COLUMN};

const DEFAULT_LOCK_STALE: Duration = Duration::from_secs(300);

/// History CSV manager
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    lock_stale_after: Duration,
    write_lock: AsyncMutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_stale_after: DEFAULT_LOCK_STALE,
            write_lock: AsyncMutex::new(()),
        }
    }

    /// Age after which a leftover lock file is considered abandoned.
    pub fn with_lock_stale_after(mut self, stale: Duration) -> Self {
        self.lock_stale_after = stale;
        self
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        fs::create_dir_all(&config.persistence.data_dir)?;
        Ok(Self::new(config.history_path())
            .with_lock_stale_after(Duration::from_secs(config.persistence.lock_stale_secs)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn lock_path(&self) -> PathBuf {
        self.sibling(".lock")
    }

    /// Read the table without touching the file.
    ///
    /// `Ok(None)` when the pipeline has never run, `StoreCorruption` when the
    /// file cannot be parsed.
    pub fn read(&self) -> Result<Option<HistoryTable>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        parse_table(&bytes)
            .map(Some)
            .map_err(|detail| MonitorError::StoreCorruption {
                path: self.path.clone(),
                detail,
            })
    }

    /// Load the full table, recovering from corruption.
    ///
    /// A missing file is an empty table. An unreadable one is renamed to a
    /// `.bak` sibling and also treated as empty.
    pub fn load_all(&self) -> Result<HistoryTable> {
        match self.read() {
            Ok(Some(table)) => Ok(table),
            Ok(None) => Ok(HistoryTable::new()),
            Err(MonitorError::StoreCorruption { detail, .. }) => {
                let backup = self.backup_corrupt()?;
                warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    reason = %detail,
                    "History file unreadable, moved aside and starting fresh"
                );
                Ok(HistoryTable::new())
            }
            Err(e) => Err(e),
        }
    }

    fn backup_corrupt(&self) -> Result<PathBuf> {
        let mut backup = self.sibling(".bak");
        if backup.exists() {
            backup = self.sibling(&format!(
                ".{}_{}.bak",
                Utc::now().format("%Y%m%d_%H%M%S"),
                &uuid::Uuid::new_v4().simple().to_string()[..8]
            ));
        }
        fs::rename(&self.path, &backup)?;
        Ok(backup)
    }

    /// Append one row, merging any new columns. Returns the table as written.
    pub async fn append(&self, row: HistoryRow) -> Result<HistoryTable> {
        let _in_process = self.write_lock.lock().await;
        let on_disk = self.acquire_file_lock()?;

        let mut table = self.load_all()?;
        let previous_columns = table.columns.len();
        table.push(row);
        if !on_disk.is_held() {
            return Err(MonitorError::StoreBusy(self.path.clone()));
        }
        write_table_atomic(&self.path, &table)?;

        info!(
            path = %self.path.display(),
            rows = table.len(),
            columns = table.columns.len(),
            new_columns = table.columns.len() - previous_columns,
            "History row appended"
        );
        Ok(table)
    }

    fn acquire_file_lock(&self) -> Result<FileLock> {
        let lock_path = self.lock_path();
        let token = format!("{} {}", std::process::id(), uuid::Uuid::new_v4().simple());

        for attempt in 0..2 {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(mut file) => {
                    file.write_all(token.as_bytes())?;
                    file.sync_all()?;
                    return Ok(FileLock {
                        path: lock_path,
                        token,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt == 0 => {
                    // Contents first, then age: a lock replaced in between looks fresh.
                    let observed = match fs::read_to_string(&lock_path) {
                        Ok(observed) => observed,
                        Err(e) if e.kind() == ErrorKind::NotFound => continue,
                        Err(e) => return Err(e.into()),
                    };
                    if !self.lock_is_stale(&lock_path) {
                        return Err(MonitorError::StoreBusy(self.path.clone()));
                    }
                    if !reclaim_stale_lock(&lock_path, &observed)? {
                        return Err(MonitorError::StoreBusy(self.path.clone()));
                    }
                    warn!(lock = %lock_path.display(), "Reclaimed stale history lock");
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    return Err(MonitorError::StoreBusy(self.path.clone()));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(MonitorError::StoreBusy(self.path.clone()))
    }

    fn lock_is_stale(&self, lock_path: &Path) -> bool {
        fs::metadata(lock_path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .map(|age| age >= self.lock_stale_after)
            .unwrap_or(false)
    }
}

/// Move a stale lock aside and delete it, but only if the moved file is the
/// one whose contents were judged stale.
///
/// Returns `false` when another writer got there first: either the lock was
/// already gone, or a fresh lock was moved by mistake and has been put back.
fn reclaim_stale_lock(lock_path: &Path, observed: &str) -> Result<bool> {
    let mut aside = lock_path.as_os_str().to_os_string();
    aside.push(format!(".{}.stale", uuid::Uuid::new_v4().simple()));
    let aside = PathBuf::from(aside);

    match fs::rename(lock_path, &aside) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    }

    let moved = fs::read_to_string(&aside).unwrap_or_default();
    if moved == observed {
        let _ = fs::remove_file(&aside);
        return Ok(true);
    }

    // hard_link refuses to replace a lock created in the meantime.
    if let Err(e) = fs::hard_link(&aside, lock_path) {
        warn!(lock = %lock_path.display(), error = %e, "Could not restore live history lock");
    }
    let _ = fs::remove_file(&aside);
    Ok(false)
}

/// Removes the on-disk lock when the append finishes or fails.
struct FileLock {
    path: PathBuf,
    token: String,
}

impl FileLock {
    /// The lock file still carries this writer's token.
    fn is_held(&self) -> bool {
        fs::read_to_string(&self.path)
            .map(|contents| contents == self.token)
            .unwrap_or(false)
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if !self.is_held() {
            warn!(lock = %self.path.display(), "History lock was taken over before release");
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            debug!(lock = %self.path.display(), error = %e, "Failed to remove history lock");
        }
    }
}

/// Parse history CSV bytes. Errors describe why the file is unusable.
fn parse_table(bytes: &[u8]) -> std::result::Result<HistoryTable, String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err("file is empty".to_string());
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(bytes);

    let headers = reader.headers().map_err(|e| e.to_string())?.clone();
    let mut header_iter = headers.iter();
    if header_iter.next() != Some(TIMESTAMP_COLUMN) {
        return Err(format!("first column is not {}", TIMESTAMP_COLUMN));
    }

    let columns: Vec<String> = header_iter.map(str::to_string).collect();
    let mut seen = HashSet::new();
    for column in &columns {
        if column.is_empty() {
            return Err("blank column name".to_string());
        }
        if !seen.insert(column.as_str()) {
            return Err(format!("duplicate column {}", column));
        }
    }

    let mut table = HistoryTable {
        columns: columns.clone(),
        rows: Vec::new(),
    };
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| e.to_string())?;
        let timestamp = record.get(0).unwrap_or_default().trim();
        if timestamp.is_empty() {
            return Err(format!("row {} has no timestamp", line + 1));
        }

        let mut row = HistoryRow::new(timestamp);
        for (column, cell) in columns.iter().zip(record.iter().skip(1)) {
            let cell = cell.trim();
            let value = if cell.is_empty() {
                None
            } else {
                let parsed = cell
                    .parse::<f64>()
                    .map_err(|_| format!("row {} column {}: '{}' is not a number", line + 1, column, cell))?;
                Some(parsed).filter(|v| !v.is_nan())
            };
            row.insert(column.clone(), value);
        }
        table.rows.push(row);
    }

    Ok(table)
}

fn render_cell(row: &HistoryRow, column: &str) -> String {
    row.get(column)
        .map(|v| format!("{:.2}", v))
        .unwrap_or_default()
}

/// Write the table to a temp sibling, sync, then rename over `path`.
fn write_table_atomic(path: &Path, table: &HistoryTable) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "history".to_string());
    let tmp_path = path.with_file_name(format!(
        ".{}.{}.tmp",
        file_name,
        uuid::Uuid::new_v4().simple()
    ));

    let result = (|| -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

        let mut header = vec![TIMESTAMP_COLUMN.to_string()];
        header.extend(table.columns.iter().cloned());
        writer.write_record(&header)?;

        for row in &table.rows {
            let mut record = Vec::with_capacity(table.columns.len() + 1);
            record.push(row.timestamp.clone());
            record.extend(table.columns.iter().map(|c| render_cell(row, c)));
            writer.write_record(&record)?;
        }

        let file = writer
            .into_inner()
            .map_err(|e| MonitorError::Io(e.into_error()))?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}
