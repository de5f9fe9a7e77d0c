// ABOUTME: Immutable scraper configuration: source candidates, retry budget, ranges, markers and outputs.
// ABOUTME: Loaded from JSON with serde defaults or built with ConfigBuilder, then validated once.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::{Classifier, Term};
use crate::error::ConfigError;
use crate::extractors::{EmbeddedMarkers, EntryMapping};
use crate::number::{PlausibleRange, PriceRanges};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9,bn;q=0.8";

/// What a candidate serves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentShape {
    /// Human-readable HTML.
    #[default]
    Markup,
    /// A script payload with `identifier = [...];` arrays.
    Embedded,
}

impl fmt::Display for ContentShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentShape::Markup => "markup",
            ContentShape::Embedded => "embedded",
        };
        write!(f, "{}", s)
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// One endpoint in the ordered candidate list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCandidate {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub shape: ContentShape,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl SourceCandidate {
    pub fn new(name: impl Into<String>, url: impl Into<String>, shape: ContentShape) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            shape,
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Where records are persisted. `None` disables a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPaths {
    pub csv: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            csv: Some(PathBuf::from("gold_silver_prices.csv")),
            json: Some(PathBuf::from("gold_silver_prices.json")),
        }
    }
}

/// Scraper configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: Vec<SourceCandidate>,
    pub user_agent: String,
    /// Headers sent with every request besides the User-Agent.
    pub headers: BTreeMap<String, String>,
    pub max_attempts: u32,
    pub backoff_secs: u64,
    pub interval_secs: u64,
    pub currency: String,
    pub ranges: PriceRanges,
    pub markers: EmbeddedMarkers,
    pub entry_mapping: EntryMapping,
    /// Extra classifier spellings keyed by term (`gold`, `silver`, `traditional`, `22k`, ...).
    pub synonyms: BTreeMap<String, Vec<String>>,
    pub output: OutputPaths,
}

impl Default for Config {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Accept".to_string(), DEFAULT_ACCEPT.to_string());
        headers.insert(
            "Accept-Language".to_string(),
            DEFAULT_ACCEPT_LANGUAGE.to_string(),
        );
        Self {
            sources: vec![SourceCandidate::new(
                "goldr",
                "https://www.goldr.org",
                ContentShape::Markup,
            )],
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers,
            max_attempts: 3,
            backoff_secs: 10,
            interval_secs: 2 * 60 * 60,
            currency: "BDT".to_string(),
            ranges: PriceRanges::default(),
            markers: EmbeddedMarkers::default(),
            entry_mapping: EntryMapping::default(),
            synonyms: BTreeMap::new(),
            output: OutputPaths::default(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Load and validate a JSON config file. Missing keys take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::invalid("at least one source is required"));
        }
        let mut seen = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let name = source.name.trim();
            if name.is_empty() {
                return Err(ConfigError::invalid("source name must not be empty"));
            }
            // fallback records are told apart by their source tag
            if name.to_lowercase().starts_with("fallback") {
                return Err(ConfigError::invalid(format!(
                    "source name `{}` is reserved",
                    name
                )));
            }
            if seen.contains(&name) {
                return Err(ConfigError::invalid(format!(
                    "duplicate source name `{}`",
                    name
                )));
            }
            seen.push(name);

            let url = url::Url::parse(&source.url).map_err(|e| {
                ConfigError::invalid(format!("source `{}` has invalid url: {}", name, e))
            })?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ConfigError::invalid(format!(
                    "source `{}` must use http or https",
                    name
                )));
            }
            if source.timeout_secs == 0 {
                return Err(ConfigError::invalid(format!(
                    "source `{}` needs a non-zero timeout",
                    name
                )));
            }
        }

        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts must be at least 1"));
        }
        if self.interval_secs == 0 {
            return Err(ConfigError::invalid("interval_secs must be at least 1"));
        }
        check_range("gold", &self.ranges.gold)?;
        check_range("silver", &self.ranges.silver)?;

        if self
            .sources
            .iter()
            .any(|s| s.shape == ContentShape::Embedded)
            && (self.markers.gold.trim().is_empty() || self.markers.silver.trim().is_empty())
        {
            return Err(ConfigError::invalid(
                "embedded sources need both gold and silver markers",
            ));
        }
        for term in self.synonyms.keys() {
            term.parse::<Term>().map_err(ConfigError::invalid)?;
        }
        Ok(())
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// The default classifier plus any configured synonyms.
    pub fn classifier(&self) -> Result<Classifier, ConfigError> {
        let mut classifier = Classifier::default();
        for (term, words) in &self.synonyms {
            let term: Term = term.parse().map_err(ConfigError::invalid)?;
            for word in words {
                classifier.add_synonym(term, word);
            }
        }
        Ok(classifier)
    }
}

fn check_range(metal: &str, range: &PlausibleRange) -> Result<(), ConfigError> {
    if !(range.min > 0.0 && range.min <= range.max) {
        return Err(ConfigError::invalid(format!(
            "{} range must satisfy 0 < min <= max (got {}..{})",
            metal, range.min, range.max
        )));
    }
    Ok(())
}

/// Builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
    sources_set: bool,
}

impl ConfigBuilder {
    /// Start from the defaults.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            sources_set: false,
        }
    }

    /// Append a source. The first call replaces the default source list.
    pub fn source(mut self, candidate: SourceCandidate) -> Self {
        if !self.sources_set {
            self.config.sources.clear();
            self.sources_set = true;
        }
        self.config.sources.push(candidate);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add or replace a header sent with every request.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(key.into(), value.into());
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.config.backoff_secs = backoff.as_secs();
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval_secs = interval.as_secs();
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.config.currency = currency.into();
        self
    }

    pub fn ranges(mut self, ranges: PriceRanges) -> Self {
        self.config.ranges = ranges;
        self
    }

    pub fn markers(mut self, gold: impl Into<String>, silver: impl Into<String>) -> Self {
        self.config.markers = EmbeddedMarkers {
            gold: gold.into(),
            silver: silver.into(),
        };
        self
    }

    pub fn entry_mapping(mut self, mapping: EntryMapping) -> Self {
        self.config.entry_mapping = mapping;
        self
    }

    /// Register an extra spelling for a classifier term.
    pub fn synonym(mut self, term: impl Into<String>, word: impl Into<String>) -> Self {
        self.config
            .synonyms
            .entry(term.into())
            .or_default()
            .push(word.into());
        self
    }

    pub fn csv_path(mut self, path: Option<PathBuf>) -> Self {
        self.config.output.csv = path;
        self
    }

    pub fn json_path(mut self, path: Option<PathBuf>) -> Self {
        self.config.output.json = path;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
