// ABOUTME: Resource fetching for price sources: one bounded GET with size limits and charset decoding.
// ABOUTME: Every transport, status or size failure surfaces as an Unreachable ScrapeError.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;

use crate::error::ScrapeError;

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// Options for fetching a resource.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Extra headers sent with this request only.
    pub headers: HashMap<String, String>,
    /// Upper bound for the whole request, body included.
    pub timeout: Duration,
    /// Return non-2xx responses instead of failing on them.
    pub accept_non_success: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            timeout: Duration::from_secs(30),
            accept_non_success: false,
        }
    }
}

/// Result of a successful fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResult {
    /// Decode the body, using the content-type charset when present.
    pub fn text(&self) -> String {
        decode_body(&self.body, self.content_type.as_deref())
    }
}

/// Decode body bytes to a String using charset from content-type header or detection.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(ct) = content_type {
        if let Some(charset) = extract_charset(ct) {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(body);
                return decoded.into_owned();
            }
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract charset value from Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_lowercase();
    for part in lower.split(';') {
        if let Some(charset) = part.trim().strip_prefix("charset=") {
            let charset = charset.trim_matches('"').trim_matches('\'');
            return Some(charset.to_string());
        }
    }
    None
}

/// Fetch `url` on behalf of the source called `source_name`.
pub async fn fetch(
    client: &reqwest::Client,
    source_name: &str,
    url: &str,
    opts: &FetchOptions,
) -> Result<FetchResult, ScrapeError> {
    let parsed = url::Url::parse(url).map_err(|e| {
        ScrapeError::unreachable(
            source_name,
            "Fetch",
            Some(anyhow::anyhow!("invalid URL {}: {}", url, e)),
        )
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ScrapeError::unreachable(
            source_name,
            "Fetch",
            Some(anyhow::anyhow!("scheme must be http or https")),
        ));
    }

    let mut request = client.get(parsed).timeout(opts.timeout);
    for (key, value) in &opts.headers {
        request = request.header(key, value);
    }

    let response = request.send().await.map_err(|e| {
        let reason = if e.is_timeout() {
            anyhow::anyhow!("timed out after {:?}", opts.timeout)
        } else {
            anyhow::anyhow!("request failed: {}", e)
        };
        ScrapeError::unreachable(source_name, "Fetch", Some(reason))
    })?;

    if let Some(len) = response.content_length() {
        if len as usize > MAX_CONTENT_LENGTH {
            return Err(ScrapeError::unreachable(
                source_name,
                "Fetch",
                Some(anyhow::anyhow!("content too large")),
            ));
        }
    }

    let status = response.status();
    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    if !status.is_success() && !opts.accept_non_success {
        return Err(ScrapeError::unreachable(
            source_name,
            "Fetch",
            Some(anyhow::anyhow!("HTTP status {}", status.as_u16())),
        ));
    }

    let body = response.bytes().await.map_err(|e| {
        let reason = if e.is_timeout() {
            anyhow::anyhow!("timed out reading body after {:?}", opts.timeout)
        } else {
            anyhow::anyhow!("failed to read body: {}", e)
        };
        ScrapeError::unreachable(source_name, "Fetch", Some(reason))
    })?;

    if body.len() > MAX_CONTENT_LENGTH {
        return Err(ScrapeError::unreachable(
            source_name,
            "Fetch",
            Some(anyhow::anyhow!("content too large")),
        ));
    }

    Ok(FetchResult {
        status: status.as_u16(),
        url: url.to_string(),
        final_url,
        content_type,
        body,
    })
}
