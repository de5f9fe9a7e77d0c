// ABOUTME: JSON history kept as one pretty-printed array, rewritten on every append.
// ABOUTME: Writes go through a temp file and rename; an unreadable file is moved aside first.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::StoreError;
use crate::record::PriceRecord;
use crate::store::{ensure_parent, with_suffix, RecordSink};

#[derive(Debug, Clone)]
pub struct JsonSink {
    path: PathBuf,
}

impl JsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the history. A missing or empty file is an empty history.
    pub fn load(&self) -> Result<Vec<PriceRecord>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|e| StoreError::json(&self.path, e))
    }

    /// Load the history, moving an unreadable file to `<name>.corrupt`.
    fn load_or_set_aside(&self) -> Result<Vec<PriceRecord>, StoreError> {
        match self.load() {
            Ok(records) => Ok(records),
            Err(err) => {
                let backup = with_suffix(&self.path, ".corrupt");
                fs::rename(&self.path, &backup).map_err(|e| StoreError::io(&self.path, e))?;
                warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    error = %err,
                    "existing history unreadable, starting a new one"
                );
                Ok(Vec::new())
            }
        }
    }
}

impl RecordSink for JsonSink {
    fn name(&self) -> &str {
        "json"
    }

    fn append(&self, record: &PriceRecord) -> Result<(), StoreError> {
        ensure_parent(&self.path)?;
        let mut records = self.load_or_set_aside()?;
        records.push(record.clone());

        let body =
            serde_json::to_string_pretty(&records).map_err(|e| StoreError::json(&self.path, e))?;
        let tmp = with_suffix(&self.path, ".tmp");
        fs::write(&tmp, body).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldKind;
    use pretty_assertions::assert_eq;

    fn record(source: &str, gold: f64) -> PriceRecord {
        let mut rec = PriceRecord::captured_now(source, "BDT");
        rec.set_if_unset(FieldKind::Gold22K, gold);
        rec
    }

    #[test]
    fn appends_keep_order() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonSink::new(dir.path().join("prices.json"));
        let written: Vec<_> = (1..=4).map(|i| record("goldr", 7000.0 + i as f64)).collect();
        for rec in &written {
            sink.append(rec).unwrap();
        }

        assert_eq!(sink.load().unwrap(), written);
        assert!(!with_suffix(sink.path(), ".tmp").exists());
    }

    #[test]
    fn file_is_a_pretty_printed_array() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonSink::new(dir.path().join("prices.json"));
        sink.append(&record("goldr", 7850.5)).unwrap();
        let raw = fs::read_to_string(sink.path()).unwrap();
        assert!(raw.starts_with("[\n  {"));
        assert!(raw.contains("\"gold_22k\": 7850.5"));
    }

    #[test]
    fn corrupt_history_is_preserved_and_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.json");
        fs::write(&path, "[{\"broken\": ").unwrap();

        let sink = JsonSink::new(&path);
        sink.append(&record("goldr", 7850.5)).unwrap();

        assert_eq!(sink.load().unwrap().len(), 1);
        let backup = fs::read_to_string(dir.path().join("prices.json.corrupt")).unwrap();
        assert_eq!(backup, "[{\"broken\": ");
    }

    #[test]
    fn legacy_history_is_extended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.json");
        fs::write(
            &path,
            r#"[{"timestamp": "2024-03-09T12:05:07+06:00", "date": "2024-03-09", "time": "12:05:07",
                "gold_22k": 7850.5, "gold_21k": 7520.25, "gold_18k": 6430.75,
                "silver_price": 95.5, "source": "https://www.goldr.org"}]"#,
        )
        .unwrap();

        let sink = JsonSink::new(&path);
        sink.append(&record("goldr", 7900.0)).unwrap();
        let records = sink.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source, "https://www.goldr.org");
        assert_eq!(records[1].get(FieldKind::Gold22K), Some(7900.0));
    }

    #[test]
    fn missing_or_empty_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.json");
        assert!(JsonSink::new(&path).load().unwrap().is_empty());
        fs::write(&path, "  \n").unwrap();
        assert!(JsonSink::new(&path).load().unwrap().is_empty());
    }
}
