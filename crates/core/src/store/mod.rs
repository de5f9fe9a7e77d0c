// ABOUTME: Persistence sinks for accepted and fallback records.
// ABOUTME: Each sink fails on its own; persist_all logs failures and keeps going.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::record::PriceRecord;

pub mod csv;
pub mod json;

pub use self::csv::CsvSink;
pub use self::json::JsonSink;

/// Somewhere a record can be appended.
pub trait RecordSink: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    fn append(&self, record: &PriceRecord) -> Result<(), StoreError>;
}

/// Result of handing one record to one sink.
#[derive(Debug)]
pub struct SinkOutcome {
    pub sink: String,
    pub result: Result<(), StoreError>,
}

impl SinkOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Append `record` to every sink, in order. A failing sink never stops the others.
pub fn persist_all(sinks: &[Box<dyn RecordSink>], record: &PriceRecord) -> Vec<SinkOutcome> {
    sinks
        .iter()
        .map(|sink| {
            let result = sink.append(record);
            match &result {
                Ok(()) => debug!(sink = sink.name(), "record persisted"),
                Err(err) => warn!(sink = sink.name(), error = %err, "failed to persist record"),
            }
            SinkOutcome {
                sink: sink.name().to_string(),
                result,
            }
        })
        .collect()
}

/// `path` with `suffix` appended to its file name.
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Create the parent directory of `path` if it has one.
pub(crate) fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl RecordSink for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn append(&self, _record: &PriceRecord) -> Result<(), StoreError> {
            Err(StoreError::io(
                "/nowhere",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            ))
        }
    }

    #[test]
    fn failing_sink_does_not_block_the_next() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("prices.json");
        let sinks: Vec<Box<dyn RecordSink>> =
            vec![Box::new(Broken), Box::new(JsonSink::new(&json_path))];

        let outcomes = persist_all(&sinks, &PriceRecord::captured_now("goldr", "BDT"));

        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].is_ok());
        assert_eq!(outcomes[0].sink, "broken");
        assert!(outcomes[1].is_ok());
        assert_eq!(JsonSink::new(&json_path).load().unwrap().len(), 1);
    }

    #[test]
    fn suffix_is_appended_to_file_name() {
        assert_eq!(
            with_suffix(Path::new("out/prices.json"), ".corrupt"),
            PathBuf::from("out/prices.json.corrupt")
        );
    }
}
