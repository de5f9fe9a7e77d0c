// ABOUTME: Error types for the bullion pipeline: ErrorCode/ScrapeError plus typed extraction, store and config errors.
// ABOUTME: ScrapeError mirrors the failure taxonomy of one scrape cycle; the enums carry the leaf failures.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Categories of failure inside one scrape cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Transport error, timeout or non-success status from a candidate.
    Unreachable,
    /// Body fetched but not usable for the candidate's content shape.
    Unparseable,
    /// Every candidate failed with one of the two codes above.
    AllSourcesFailed,
    /// Content parsed but the primary field was never found.
    Incomplete,
    /// The retry budget ran out without an acceptable record.
    Exhausted,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::Unreachable => "candidate unreachable",
            ErrorCode::Unparseable => "content unparseable",
            ErrorCode::AllSourcesFailed => "all sources failed",
            ErrorCode::Incomplete => "incomplete extraction",
            ErrorCode::Exhausted => "attempts exhausted",
        };
        write!(f, "{}", s)
    }
}

/// The error type for fetch and extraction operations.
#[derive(Debug, Error)]
pub struct ScrapeError {
    pub code: ErrorCode,
    /// Candidate name (or URL) the failure belongs to; empty for aggregate failures.
    pub source_name: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bullion: {}", self.op)?;
        if !self.source_name.is_empty() {
            write!(f, " {}", self.source_name)?;
        }
        write!(f, ": {}", self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl ScrapeError {
    fn with_code(
        code: ErrorCode,
        source_name: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            source_name: source_name.into(),
            op: op.into(),
            source,
        }
    }

    /// Create an Unreachable error.
    pub fn unreachable(
        source_name: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Unreachable, source_name, op, source)
    }

    /// Create an Unparseable error.
    pub fn unparseable(
        source_name: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Unparseable, source_name, op, source)
    }

    /// Create an AllSourcesFailed error.
    pub fn all_sources_failed(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::with_code(ErrorCode::AllSourcesFailed, "", op, source)
    }

    /// Create an Incomplete error.
    pub fn incomplete(
        source_name: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Incomplete, source_name, op, source)
    }

    /// Create an Exhausted error.
    pub fn exhausted(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::with_code(ErrorCode::Exhausted, "", op, source)
    }

    /// Wrap an embedded-array failure for the given candidate.
    pub fn from_embedded(source_name: impl Into<String>, err: EmbeddedError) -> Self {
        Self::unparseable(source_name, "ExtractEmbedded", Some(anyhow::Error::new(err)))
    }

    /// The embedded-array failure behind this error, if that is what caused it.
    pub fn embedded(&self) -> Option<&EmbeddedError> {
        self.source.as_ref()?.downcast_ref::<EmbeddedError>()
    }

    /// Returns true if this is an Unreachable error.
    pub fn is_unreachable(&self) -> bool {
        self.code == ErrorCode::Unreachable
    }

    /// Returns true if this is an Unparseable error.
    pub fn is_unparseable(&self) -> bool {
        self.code == ErrorCode::Unparseable
    }

    /// Returns true if this is an AllSourcesFailed error.
    pub fn is_all_sources_failed(&self) -> bool {
        self.code == ErrorCode::AllSourcesFailed
    }

    /// Returns true if this is an Incomplete error.
    pub fn is_incomplete(&self) -> bool {
        self.code == ErrorCode::Incomplete
    }

    /// Returns true if this is an Exhausted error.
    pub fn is_exhausted(&self) -> bool {
        self.code == ErrorCode::Exhausted
    }
}

/// Failures of embedded-array extraction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmbeddedError {
    /// No `identifier = [...];` assignment for the named marker.
    #[error("marker `{0}` not found")]
    MissingMarker(String),

    /// The bracketed text for the marker is not a JSON array.
    #[error("array `{marker}` is malformed: {reason}")]
    MalformedArray { marker: String, reason: String },

    /// The gold array is shorter than the positional mapping needs.
    #[error("array `{marker}` has {found} entries, need at least {required}")]
    InsufficientEntries {
        marker: String,
        found: usize,
        required: usize,
    },
}

/// Failures writing or reading the persisted history.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("json error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        StoreError::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StoreError::Json {
            path: path.into(),
            source,
        }
    }
}

/// Failures loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ConfigError::Invalid(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_op_source_and_code() {
        let err = ScrapeError::unreachable(
            "goldr",
            "Fetch",
            Some(anyhow::anyhow!("HTTP status 503")),
        );
        assert_eq!(
            err.to_string(),
            "bullion: Fetch goldr: candidate unreachable: HTTP status 503"
        );
    }

    #[test]
    fn aggregate_display_omits_empty_source_name() {
        let err = ScrapeError::all_sources_failed("FetchFirst", None);
        assert_eq!(err.to_string(), "bullion: FetchFirst: all sources failed");
        assert!(err.is_all_sources_failed());
    }

    #[test]
    fn embedded_failure_is_recoverable_by_downcast() {
        let err = ScrapeError::from_embedded(
            "bajus",
            EmbeddedError::MissingMarker("silverPrices".into()),
        );
        assert!(err.is_unparseable());
        assert_eq!(
            err.embedded(),
            Some(&EmbeddedError::MissingMarker("silverPrices".into()))
        );
    }

    #[test]
    fn embedded_is_none_for_other_sources() {
        let err = ScrapeError::incomplete("goldr", "Extract", Some(anyhow::anyhow!("no 22K")));
        assert!(err.embedded().is_none());
    }
}
