// ABOUTME: Plausibility-filtered number scanning for price text.
// ABOUTME: Finds comma-grouped or bare decimal tokens and returns the first one inside a range.

//! Price token scanning.
//!
//! Listings mix prices with dates, percentages and counts in the same text
//! node. Every numeric token is tried left to right and the plausibility range
//! decides which one is the price; position alone is not trusted.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::record::FieldKind;

/// Comma-grouped thousands (western or lakh style) or a bare digit run, each
/// with an optional fraction.
static PRICE_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\d{1,3}(?:,\d{3})+|\d{1,2}(?:,\d{2})+,\d{3}|\d+)(?:\.\d+)?").unwrap()
});

/// Inclusive interval a parsed number must fall in to count as a price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlausibleRange {
    pub min: f64,
    pub max: f64,
}

impl PlausibleRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// First token in `text` whose value lies in this range.
    pub fn find_in(&self, text: &str) -> Option<f64> {
        parse_price(text, self.min, self.max)
    }
}

/// Plausibility ranges per metal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRanges {
    pub gold: PlausibleRange,
    pub silver: PlausibleRange,
}

impl Default for PriceRanges {
    /// Per-gram prices in taka, as quoted by the default source.
    fn default() -> Self {
        Self {
            gold: PlausibleRange::new(5_000.0, 15_000.0),
            silver: PlausibleRange::new(50.0, 200.0),
        }
    }
}

impl PriceRanges {
    pub fn for_kind(&self, kind: FieldKind) -> PlausibleRange {
        if kind.is_silver() {
            self.silver
        } else {
            self.gold
        }
    }
}

/// Scan `text` for numeric tokens and return the first within `[min, max]`.
///
/// `None` means no plausible price is present, which is not an error.
pub fn parse_price(text: &str, min: f64, max: f64) -> Option<f64> {
    let text = normalize_digits(text);
    PRICE_TOKEN_RE
        .find_iter(&text)
        .filter_map(|m| parse_token(m.as_str()))
        .find(|v| *v >= min && *v <= max)
}

/// Parse one token, dropping thousands separators.
pub fn parse_token(token: &str) -> Option<f64> {
    let cleaned: String = token.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok()
}

/// Parse a loosely formatted numeric string such as `"1,52,000"` or `" ৭৮৫০০ "`.
///
/// Unlike [`parse_price`] this accepts any grouping, since it is used on
/// values that are already known to be a single number.
pub fn parse_loose(value: &str) -> Option<f64> {
    let value = normalize_digits(value.trim());
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Replace Bengali digits with their ASCII counterparts.
pub fn normalize_digits(text: &str) -> Cow<'_, str> {
    if !text.chars().any(is_bengali_digit) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| {
                if is_bengali_digit(c) {
                    char::from(b'0' + (c as u32 - 0x09E6) as u8)
                } else {
                    c
                }
            })
            .collect(),
    )
}

fn is_bengali_digit(c: char) -> bool {
    ('\u{09E6}'..='\u{09EF}').contains(&c)
}

/// True for ASCII or Bengali digits.
pub fn is_digit(c: char) -> bool {
    c.is_ascii_digit() || is_bengali_digit(c)
}
