// ABOUTME: Ordered candidate fetching: first source with a 2xx, shape-valid body wins.
// ABOUTME: Also hosts the connectivity probe that reports status, type and size per candidate.

use std::collections::HashMap;
use std::fmt;

use tracing::{info, warn};

use crate::config::{ContentShape, SourceCandidate};
use crate::error::ScrapeError;
use crate::extractors::embedded::check_markers;
use crate::extractors::EmbeddedMarkers;
use crate::extractors::markup::looks_like_markup;
use crate::resource::{fetch, FetchOptions};

/// A candidate's body that passed its shape check.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub candidate: SourceCandidate,
    pub status: u16,
    pub final_url: String,
    pub body: String,
}

/// Fetch one candidate and check the body against its declared shape.
///
/// Embedded bodies must carry both `markers` as parseable arrays; otherwise
/// the candidate is unparseable and the caller moves on.
pub async fn fetch_candidate(
    http: &reqwest::Client,
    candidate: &SourceCandidate,
    markers: &EmbeddedMarkers,
) -> Result<Fetched, ScrapeError> {
    let opts = FetchOptions {
        headers: HashMap::new(),
        timeout: candidate.timeout(),
        accept_non_success: false,
    };
    let result = fetch(http, &candidate.name, &candidate.url, &opts).await?;
    let body = result.text();

    match candidate.shape {
        ContentShape::Markup if !looks_like_markup(&body) => {
            return Err(ScrapeError::unparseable(
                &candidate.name,
                "Fetch",
                Some(anyhow::anyhow!(
                    "body ({} bytes) does not look like {} content",
                    body.len(),
                    candidate.shape
                )),
            ));
        }
        ContentShape::Markup => {}
        ContentShape::Embedded => check_markers(&body, markers)
            .map_err(|e| ScrapeError::from_embedded(&candidate.name, e))?,
    }

    Ok(Fetched {
        candidate: candidate.clone(),
        status: result.status,
        final_url: result.final_url,
        body,
    })
}

/// Try `candidates` strictly in order and return the first usable body.
///
/// Later candidates are not contacted once one succeeds. When none does the
/// error lists every candidate's failure.
pub async fn fetch_first(
    http: &reqwest::Client,
    candidates: &[SourceCandidate],
    markers: &EmbeddedMarkers,
) -> Result<Fetched, ScrapeError> {
    let mut failures = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match fetch_candidate(http, candidate, markers).await {
            Ok(fetched) => {
                info!(
                    source = %candidate.name,
                    status = fetched.status,
                    bytes = fetched.body.len(),
                    "source responded"
                );
                return Ok(fetched);
            }
            Err(err) => {
                warn!(source = %candidate.name, error = %err, "source failed");
                failures.push(err.to_string());
            }
        }
    }

    let detail = if failures.is_empty() {
        "no sources configured".to_string()
    } else {
        failures.join("; ")
    };
    Err(ScrapeError::all_sources_failed(
        "FetchFirst",
        Some(anyhow::anyhow!(detail)),
    ))
}

/// Outcome of probing one candidate.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub name: String,
    pub url: String,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub content_length: Option<usize>,
    pub error: Option<String>,
}

impl ProbeReport {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, Some(s) if (200..300).contains(&s))
    }
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.status, &self.error) {
            (Some(status), _) => write!(
                f,
                "{} {}: status {}, {}, {} bytes",
                self.name,
                self.url,
                status,
                self.content_type.as_deref().unwrap_or("unknown type"),
                self.content_length.unwrap_or(0)
            ),
            (None, Some(err)) => write!(f, "{} {}: {}", self.name, self.url, err),
            (None, None) => write!(f, "{} {}: no response", self.name, self.url),
        }
    }
}

/// Issue one GET per candidate and report what came back, without extracting.
pub async fn probe(http: &reqwest::Client, candidates: &[SourceCandidate]) -> Vec<ProbeReport> {
    let mut reports = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let opts = FetchOptions {
            timeout: candidate.timeout(),
            accept_non_success: true,
            ..Default::default()
        };
        let report = match fetch(http, &candidate.name, &candidate.url, &opts).await {
            Ok(result) => ProbeReport {
                name: candidate.name.clone(),
                url: candidate.url.clone(),
                status: Some(result.status),
                content_type: result.content_type.clone(),
                content_length: Some(result.body.len()),
                error: None,
            },
            Err(err) => ProbeReport {
                name: candidate.name.clone(),
                url: candidate.url.clone(),
                status: None,
                content_type: None,
                content_length: None,
                error: Some(err.to_string()),
            },
        };
        info!(report = %report, "probe");
        reports.push(report);
    }
    reports
}
