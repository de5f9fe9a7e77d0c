// ABOUTME: Cycle-level persistence tests: records from repeated cycles land in CSV and JSON in order.
// ABOUTME: Uses a mock source and temp directories; pauses are skipped with a no-op pacer.

use std::fs;
use std::time::Duration;

use async_trait::async_trait;
use bullion_core::cycle::{run_cycle_with, sinks_from_config};
use bullion_core::{
    Config, ContentShape, FieldKind, JsonSink, Pacer, PlausibleRange, PriceRanges, Scraper,
    SourceCandidate, FALLBACK_SOURCE,
};
use httpmock::prelude::*;
use tempfile::TempDir;

struct NoPause;

#[async_trait]
impl Pacer for NoPause {
    async fn pause(&self, _duration: Duration) {}
}

fn config_for(url: String, dir: &TempDir) -> Config {
    Config::builder()
        .source(SourceCandidate::new("goldr", url, ContentShape::Markup))
        .ranges(PriceRanges {
            gold: PlausibleRange::new(5_000.0, 15_000.0),
            silver: PlausibleRange::new(50.0, 200.0),
        })
        .max_attempts(2)
        .csv_path(Some(dir.path().join("prices.csv")))
        .json_path(Some(dir.path().join("prices.json")))
        .build()
        .unwrap()
}

#[tokio::test]
async fn repeated_cycles_append_in_order() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200)
            .body("<div><span>22K Gold: 7,850.50</span><span>Silver: 95.50</span></div>");
    });
    let dir = TempDir::new().unwrap();
    let config = config_for(server.url("/"), &dir);
    let sinks = sinks_from_config(&config.output);
    let scraper = Scraper::new(config).unwrap();

    let mut timestamps = Vec::new();
    for _ in 0..3 {
        let report = run_cycle_with(&scraper, &sinks, &NoPause).await;
        assert!(!report.is_fallback());
        assert_eq!(report.persisted(), 2);
        timestamps.push(report.record.timestamp);
    }

    let history = JsonSink::new(dir.path().join("prices.json")).load().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(
        history.iter().map(|r| r.timestamp).collect::<Vec<_>>(),
        timestamps
    );
    assert!(history
        .iter()
        .all(|r| r.get(FieldKind::Gold22K) == Some(7850.50)));

    let csv = fs::read_to_string(dir.path().join("prices.csv")).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("Timestamp,Date,Time,Gold_22K"));
    assert!(lines[1].contains(",7850.50,"));
    assert!(lines[1].ends_with(",BDT,goldr"));
}

#[tokio::test]
async fn fallback_records_are_persisted_with_their_tag() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(502);
    });
    let dir = TempDir::new().unwrap();
    let config = config_for(server.url("/"), &dir);
    let sinks = sinks_from_config(&config.output);
    let scraper = Scraper::new(config).unwrap();

    let report = run_cycle_with(&scraper, &sinks, &NoPause).await;
    assert!(report.is_fallback());
    assert_eq!(report.attempts, 2);

    let history = JsonSink::new(dir.path().join("prices.json")).load().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].source, FALLBACK_SOURCE);
    assert!(history[0].is_fallback());

    let csv = fs::read_to_string(dir.path().join("prices.csv")).unwrap();
    assert!(csv.lines().nth(1).unwrap().ends_with(",BDT,fallback:static-estimate"));
}

#[tokio::test]
async fn failing_sink_does_not_stop_the_other() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).body("<p>22K Gold: 7,850.50</p>");
    });
    let dir = TempDir::new().unwrap();
    // a directory where the CSV file should be makes the CSV sink fail
    fs::create_dir(dir.path().join("prices.csv")).unwrap();
    let config = config_for(server.url("/"), &dir);
    let sinks = sinks_from_config(&config.output);
    let scraper = Scraper::new(config).unwrap();

    let report = run_cycle_with(&scraper, &sinks, &NoPause).await;

    assert_eq!(report.sinks.len(), 2);
    assert!(!report.sinks[0].is_ok());
    assert!(report.sinks[1].is_ok());
    assert_eq!(
        JsonSink::new(dir.path().join("prices.json")).load().unwrap().len(),
        1
    );
}
