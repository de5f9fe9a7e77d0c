// ABOUTME: The Scraper owns the configuration, HTTP client and classifier and wires the pipeline together.
// ABOUTME: Provides fetch, extract, scrape_once and collect (retry then fallback) for one cycle.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use scraper::Html;
use tracing::{debug, warn};

use crate::classify::Classifier;
use crate::config::{Config, ContentShape};
use crate::error::{ConfigError, ScrapeError};
use crate::extractors::{extract_from_document, extract_from_embedded};
use crate::fallback::fallback_record;
use crate::fetch::{fetch_first, probe, Fetched, ProbeReport};
use crate::record::PriceRecord;
use crate::retry::{Pacer, Pipeline, RetryDriver, RetryOutcome, TokioPacer};

/// The price pipeline for one configuration.
#[derive(Debug, Clone)]
pub struct Scraper {
    config: Config,
    http: reqwest::Client,
    classifier: Classifier,
}

/// What one collection produced: an observation or the fallback.
#[derive(Debug)]
pub struct Collected {
    pub record: PriceRecord,
    pub attempts: u32,
    /// Why the retry budget ran out, when the record is the fallback.
    pub last_error: Option<ScrapeError>,
}

impl Collected {
    pub fn is_fallback(&self) -> bool {
        self.record.is_fallback()
    }
}

impl Scraper {
    /// Validate `config` and build the HTTP client from it.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(default_headers(&config)?)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| ConfigError::invalid(format!("building HTTP client: {}", e)))?;
        Self::with_http_client(config, http)
    }

    /// Use a caller-supplied HTTP client.
    pub fn with_http_client(config: Config, http: reqwest::Client) -> Result<Self, ConfigError> {
        config.validate()?;
        let classifier = config.classifier()?;
        Ok(Self {
            config,
            http,
            classifier,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// First usable body among the configured candidates.
    pub async fn fetch(&self) -> Result<Fetched, ScrapeError> {
        fetch_first(&self.http, &self.config.sources, &self.config.markers).await
    }

    /// Run the extractor matching the candidate's shape.
    pub fn extract(&self, fetched: &Fetched) -> Result<PriceRecord, ScrapeError> {
        match fetched.candidate.shape {
            ContentShape::Markup => Ok(self.extract_markup(&fetched.body, &fetched.candidate.name)),
            ContentShape::Embedded => {
                self.extract_embedded(&fetched.body, &fetched.candidate.name)
            }
        }
    }

    /// Extract from HTML. Never fails; an unusable page yields an empty record.
    pub fn extract_markup(&self, html: &str, source: &str) -> PriceRecord {
        let mut record = PriceRecord::captured_now(source, &self.config.currency);
        let doc = Html::parse_document(html);
        let found =
            extract_from_document(&doc, &mut record, &self.classifier, &self.config.ranges);
        debug!(source, fields = found, "markup extraction finished");
        record
    }

    /// Extract from a script payload with `identifier = [...];` arrays.
    pub fn extract_embedded(&self, raw: &str, source: &str) -> Result<PriceRecord, ScrapeError> {
        let fields = extract_from_embedded(
            raw,
            &self.config.markers,
            self.config.entry_mapping,
            &self.classifier,
        )
        .map_err(|e| ScrapeError::from_embedded(source, e))?;
        let mut record = PriceRecord::captured_now(source, &self.config.currency);
        record.prices = fields;
        debug!(
            source,
            fields = record.prices.observed().len(),
            "embedded extraction finished"
        );
        Ok(record)
    }

    /// One fetch + extract pass. The record may still lack the primary field.
    pub async fn scrape_once(&self) -> Result<PriceRecord, ScrapeError> {
        let fetched = self.fetch().await?;
        self.extract(&fetched)
    }

    /// Retry with the configured budget, sleeping between attempts, then fall back.
    pub async fn collect(&self) -> Collected {
        self.collect_with(&TokioPacer).await
    }

    /// Like [`Scraper::collect`] with a caller-supplied pacer.
    pub async fn collect_with<T: Pacer + ?Sized>(&self, pacer: &T) -> Collected {
        let driver = RetryDriver::new(self.config.max_attempts, self.config.backoff());
        let mut pipeline = ScrapePipeline { scraper: self };
        match driver.run(&mut pipeline, pacer).await {
            RetryOutcome::Accepted { record, attempts } => Collected {
                record,
                attempts,
                last_error: None,
            },
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                let exhausted = ScrapeError::exhausted(
                    "Collect",
                    Some(anyhow::anyhow!("{} attempts: {}", attempts, last_error)),
                );
                warn!(error = %exhausted, "using fallback record");
                Collected {
                    record: fallback_record(&self.config.currency),
                    attempts,
                    last_error: Some(exhausted),
                }
            }
        }
    }

    /// Connectivity report for every candidate.
    pub async fn probe(&self) -> Vec<ProbeReport> {
        probe(&self.http, &self.config.sources).await
    }
}

struct ScrapePipeline<'a> {
    scraper: &'a Scraper,
}

#[async_trait::async_trait]
impl<'a> Pipeline for ScrapePipeline<'a> {
    async fn attempt(&mut self, attempt: u32) -> Result<PriceRecord, ScrapeError> {
        debug!(attempt, "starting attempt");
        self.scraper.scrape_once().await
    }
}

fn default_headers(config: &Config) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();
    for (key, value) in &config.headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| ConfigError::invalid(format!("header name `{}`: {}", key, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ConfigError::invalid(format!("header `{}` value: {}", key, e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceCandidate;
    use crate::number::{PlausibleRange, PriceRanges};
    use crate::record::{FieldKind, SilverTier};
    use pretty_assertions::assert_eq;

    fn scraper() -> Scraper {
        let config = Config::builder()
            .ranges(PriceRanges {
                gold: PlausibleRange::new(50_000.0, 250_000.0),
                silver: PlausibleRange::new(50.0, 200.0),
            })
            .build()
            .unwrap();
        Scraper::new(config).unwrap()
    }

    #[test]
    fn markup_extraction_stamps_source_and_currency() {
        let rec = scraper().extract_markup("<li>22K Gold: 78,500.50</li>", "goldr");
        assert_eq!(rec.source, "goldr");
        assert_eq!(rec.currency, "BDT");
        assert_eq!(rec.get(FieldKind::Gold22K), Some(78500.50));
        assert!(rec.is_complete());
    }

    #[test]
    fn embedded_failure_is_unparseable_with_cause() {
        let err = scraper()
            .extract_embedded("goldPrices = [1, 2, 3, 4];", "bajus")
            .unwrap_err();
        assert!(err.is_unparseable());
        assert_eq!(err.source_name, "bajus");
        assert!(err.embedded().is_some());
    }

    #[test]
    fn embedded_success_fills_record() {
        let raw = "goldPrices = [152000, 145000, 124500, 103000];\nsilverPrices = [2450];";
        let rec = scraper().extract_embedded(raw, "bajus").unwrap();
        assert_eq!(rec.get(FieldKind::Gold22K), Some(152000.0));
        assert_eq!(
            rec.get(FieldKind::Silver(SilverTier::Reference)),
            Some(2450.0)
        );
    }

    #[test]
    fn invalid_header_is_a_config_error() {
        let config = Config::builder()
            .header("bad header", "x")
            .build()
            .unwrap();
        assert!(matches!(Scraper::new(config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn configuration_is_validated() {
        let mut config = Config::default();
        config.sources = vec![SourceCandidate::new(
            "fallback",
            "https://example.com",
            ContentShape::Markup,
        )];
        assert!(Scraper::new(config).is_err());
    }
}
