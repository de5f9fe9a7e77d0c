// ABOUTME: Markup-mode extractor walking text-bearing HTML elements in document order.
// ABOUTME: Classifies each element's text, parses a plausible price per field, first match wins.

//! Markup extraction.
//!
//! Key behaviors:
//! - Elements are visited in document order, innermost first: an element's
//!   descendants are read before the element itself. A field keeps the first
//!   plausible value seen, so earlier occurrences on the page win and a
//!   wrapping container only fills fields its rows did not.
//! - Each fragment is scanned left to right; the plausibility range picks the
//!   price, not its position relative to the label.
//! - Price attributes are consulted for the primary field only, and only
//!   when the text pass did not find it.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::classify::Classifier;
use crate::number::PriceRanges;
use crate::record::{FieldKind, PriceRecord};

/// Elements that can carry human-readable price text.
static TEXT_NODES: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "table, tr, th, td, div, span, p, li, dd, dt, label, strong, b, h1, h2, h3, h4, h5, h6",
    )
    .unwrap()
});

/// Attributes that may hold a literal primary-field price, in priority order.
const PRIMARY_PRICE_ATTRS: &[&str] = &["data-gold-22k", "data-22k", "data-price"];

static PRICE_ATTR_NODES: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[data-gold-22k], [data-22k], [data-price]").unwrap());

/// Normalizes whitespace in a string by collapsing runs of whitespace into single spaces.
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fill `record` from one text fragment. Returns the fields it set.
pub fn extract_from_text(
    text: &str,
    record: &mut PriceRecord,
    classifier: &Classifier,
    ranges: &PriceRanges,
) -> Vec<FieldKind> {
    let text = text.trim();
    let mut set = Vec::new();
    for kind in classifier.classify(text) {
        if record.prices.is_set(kind) {
            continue;
        }
        if let Some(v) = ranges.for_kind(kind).find_in(text) {
            if record.set_if_unset(kind, v) {
                debug!(field = %kind, value = v, "extracted price");
                set.push(kind);
            }
        }
    }
    set
}

/// Fill `record` from a parsed document. Returns how many fields were set.
pub fn extract_from_document(
    doc: &Html,
    record: &mut PriceRecord,
    classifier: &Classifier,
    ranges: &PriceRanges,
) -> usize {
    let mut count = 0;
    for el in text_nodes_innermost_first(doc) {
        let text = normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "));
        if text.is_empty() {
            continue;
        }
        count += extract_from_text(&text, record, classifier, ranges).len();
    }

    if !record.prices.is_set(FieldKind::PRIMARY) {
        if let Some(v) = primary_from_attributes(doc, ranges) {
            if record.set_if_unset(FieldKind::PRIMARY, v) {
                debug!(value = v, "primary price taken from attribute");
                count += 1;
            }
        }
    }
    count
}

/// Text-bearing elements in document order, each after its descendants.
fn text_nodes_innermost_first(doc: &Html) -> Vec<ElementRef<'_>> {
    let mut out = Vec::new();
    let mut stack = vec![(doc.root_element(), false)];
    while let Some((el, expanded)) = stack.pop() {
        if expanded {
            if TEXT_NODES.matches(&el) {
                out.push(el);
            }
            continue;
        }
        stack.push((el, true));
        let children: Vec<_> = el.children().filter_map(ElementRef::wrap).collect();
        stack.extend(children.into_iter().rev().map(|child| (child, false)));
    }
    out
}

/// First price attribute value within the gold range.
fn primary_from_attributes(doc: &Html, ranges: &PriceRanges) -> Option<f64> {
    let range = ranges.for_kind(FieldKind::PRIMARY);
    for attr in PRIMARY_PRICE_ATTRS {
        for el in doc.select(&PRICE_ATTR_NODES) {
            if let Some(raw) = el.value().attr(attr) {
                if let Some(v) = range.find_in(raw.trim()) {
                    return Some(v);
                }
            }
        }
    }
    None
}

/// Cheap syntactic check used before accepting a markup body.
pub fn looks_like_markup(body: &str) -> bool {
    let trimmed = body.trim_start();
    !trimmed.is_empty() && trimmed.contains('<') && trimmed.contains('>')
}
