// ABOUTME: One scrape-and-persist cycle: collect a record (observation or fallback) and hand it to every sink.
// ABOUTME: Logs a single summary line per cycle; nothing in here fails the caller.

use tracing::info;

use crate::client::Scraper;
use crate::config::OutputPaths;
use crate::record::{FieldKind, PriceRecord, SilverTier};
use crate::retry::{Pacer, TokioPacer};
use crate::store::{persist_all, CsvSink, JsonSink, RecordSink, SinkOutcome};

/// What happened during one cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub record: PriceRecord,
    pub attempts: u32,
    pub sinks: Vec<SinkOutcome>,
}

impl CycleReport {
    pub fn is_fallback(&self) -> bool {
        self.record.is_fallback()
    }

    /// Sinks that stored the record.
    pub fn persisted(&self) -> usize {
        self.sinks.iter().filter(|s| s.is_ok()).count()
    }
}

/// Sinks for the configured output paths, CSV first.
pub fn sinks_from_config(output: &OutputPaths) -> Vec<Box<dyn RecordSink>> {
    let mut sinks: Vec<Box<dyn RecordSink>> = Vec::new();
    if let Some(path) = &output.csv {
        sinks.push(Box::new(CsvSink::new(path)));
    }
    if let Some(path) = &output.json {
        sinks.push(Box::new(JsonSink::new(path)));
    }
    sinks
}

pub async fn run_cycle(scraper: &Scraper, sinks: &[Box<dyn RecordSink>]) -> CycleReport {
    run_cycle_with(scraper, sinks, &TokioPacer).await
}

pub async fn run_cycle_with<T: Pacer + ?Sized>(
    scraper: &Scraper,
    sinks: &[Box<dyn RecordSink>],
    pacer: &T,
) -> CycleReport {
    let collected = scraper.collect_with(pacer).await;
    let outcomes = persist_all(sinks, &collected.record);
    let report = CycleReport {
        record: collected.record,
        attempts: collected.attempts,
        sinks: outcomes,
    };

    let rec = &report.record;
    let show = |kind: FieldKind| {
        rec.get(kind)
            .map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
    };
    info!(
        source = %rec.source,
        gold_22k = %show(FieldKind::Gold22K),
        gold_21k = %show(FieldKind::Gold21K),
        gold_18k = %show(FieldKind::Gold18K),
        silver = %show(FieldKind::Silver(SilverTier::Reference)),
        attempts = report.attempts,
        fallback = report.is_fallback(),
        persisted = report.persisted(),
        sinks = report.sinks.len(),
        "cycle complete"
    );
    report
}
