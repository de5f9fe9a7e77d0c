// ABOUTME: Append-only CSV history, one row per record with a header written once.
// ABOUTME: Prices use two decimals and unset fields print as 0.00.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::record::{FieldKind, PriceRecord};
use crate::store::{ensure_parent, RecordSink};

/// Column labels in row order.
pub fn header() -> Vec<&'static str> {
    let mut cols = vec!["Timestamp", "Date", "Time"];
    cols.extend(FieldKind::ALL.iter().map(|k| k.column()));
    cols.extend(["Currency", "Source"]);
    cols
}

/// One CSV row for `record`.
pub fn row(record: &PriceRecord) -> Vec<String> {
    let mut fields = vec![
        record.timestamp.to_rfc3339(),
        record.date.clone(),
        record.time.clone(),
    ];
    fields.extend(
        FieldKind::ALL
            .iter()
            .map(|k| format!("{:.2}", record.get(*k).unwrap_or(0.0))),
    );
    fields.push(record.currency.clone());
    fields.push(record.source.clone());
    fields
}

#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn append(&self, record: &PriceRecord) -> Result<(), StoreError> {
        ensure_parent(&self.path)?;
        let needs_header = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;

        let mut writer = ::csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer
                .write_record(header())
                .map_err(|e| StoreError::csv(&self.path, e))?;
        }
        writer
            .write_record(row(record))
            .map_err(|e| StoreError::csv(&self.path, e))?;
        writer.flush().map_err(|e| StoreError::io(&self.path, e))
    }
}
