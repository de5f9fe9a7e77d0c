// ABOUTME: Main library entry point for the bullion precious-metal price scraper.
// ABOUTME: Re-exports the public API: Scraper, Config, PriceRecord, FieldKind, the errors and the sinks.

//! Bullion - fetch precious-metal price listings and keep a durable history.
//!
//! Each cycle tries an ordered list of sources, extracts gold and silver
//! prices from whatever shape of content comes back, retries a bounded number
//! of times and falls back to a clearly tagged static record when nothing
//! usable was found. Records are appended to CSV and JSON histories.
//!
//! # Example
//!
//! ```no_run
//! use bullion_core::{cycle, Config, Scraper};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let sinks = cycle::sinks_from_config(&config.output);
//!     let scraper = Scraper::new(config)?;
//!     let report = cycle::run_cycle(&scraper, &sinks).await;
//!     println!("{}", serde_json::to_string_pretty(&report.record)?);
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod client;
pub mod config;
pub mod cycle;
pub mod error;
pub mod extractors;
pub mod fallback;
pub mod fetch;
pub mod number;
pub mod record;
pub mod resource;
pub mod retry;
pub mod store;

pub use crate::classify::{Classifier, Rule, Term};
pub use crate::client::{Collected, Scraper};
pub use crate::config::{Config, ConfigBuilder, ContentShape, OutputPaths, SourceCandidate};
pub use crate::cycle::{run_cycle, CycleReport};
pub use crate::error::{ConfigError, EmbeddedError, ErrorCode, ScrapeError, StoreError};
pub use crate::extractors::{EmbeddedMarkers, EntryMapping};
pub use crate::fallback::fallback_record;
pub use crate::fetch::{Fetched, ProbeReport};
pub use crate::number::{parse_price, PlausibleRange, PriceRanges};
pub use crate::record::{FieldKind, PriceFields, PriceRecord, SilverTier, FALLBACK_SOURCE};
pub use crate::retry::{Pacer, Pipeline, RetryDriver, RetryOutcome, TokioPacer};
pub use crate::store::{CsvSink, JsonSink, RecordSink};
