//! Monitoring list loader
//!
//! Reads the small CSV lookup table of item name / source hint. Lists are
//! maintained by hand, often in a spreadsheet that saves Big5 (cp950), so
//! decoding tries UTF-8 first and falls back to Big5.

use csv::ReaderBuilder;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{MonitorError, Result};
use crate::types::MonitoringItem;

const NAME_HEADERS: &[&str] = &["itemname", "item", "name", "名稱", "項目"];
const HINT_HEADERS: &[&str] = &["url", "source", "note", "hint", "網址", "備註"];

/// Load the monitoring list from disk.
pub fn load_monitoring_list(path: &Path) -> Result<Vec<MonitoringItem>> {
    let bytes = fs::read(path).map_err(|e| {
        MonitorError::ParseFailure(format!("cannot read {}: {}", path.display(), e))
    })?;
    let text = decode_list_bytes(&bytes);
    let items = parse_monitoring_list(&text)?;
    info!(path = %path.display(), items = items.len(), "Loaded monitoring list");
    Ok(items)
}

/// Decode as UTF-8 (BOM stripped), falling back to Big5.
pub fn decode_list_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            warn!("UTF-8 decode failed, trying Big5 (cp950)");
            let (text, _, had_errors) = encoding_rs::BIG5.decode(bytes);
            if had_errors {
                warn!("Big5 decode replaced malformed sequences");
            }
            text.into_owned()
        }
    }
}

/// Parse decoded list text into items.
///
/// Recognised headers pick the name and hint columns; otherwise the first
/// column is the name and the second, if present, the hint. Blank names are
/// skipped and repeated names keep their first occurrence.
pub fn parse_monitoring_list(text: &str) -> Result<Vec<MonitoringItem>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(MonitorError::ParseFailure(
            "monitoring list has no header row".to_string(),
        ));
    }

    let find = |candidates: &[&str]| {
        headers
            .iter()
            .position(|h| candidates.contains(&h.to_lowercase().as_str()))
    };
    let (name_idx, hint_idx) = match find(NAME_HEADERS) {
        Some(name_idx) => (name_idx, find(HINT_HEADERS)),
        None => {
            warn!(
                headers = ?headers.iter().collect::<Vec<_>>(),
                "Unrecognised list headers, using first column as item names"
            );
            (0, if headers.len() > 1 { Some(1) } else { None })
        }
    };

    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for record in reader.records() {
        let record = record?;
        let name = record.get(name_idx).unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        if !seen.insert(name.to_string()) {
            warn!(item = %name, "Duplicate item in monitoring list, keeping first");
            continue;
        }
        let source_hint = hint_idx
            .and_then(|i| record.get(i))
            .filter(|h| !h.is_empty())
            .map(str::to_string);
        items.push(MonitoringItem {
            name: name.to_string(),
            source_hint,
        });
    }

    Ok(items)
}
