// ABOUTME: Embedded-array extractor for price tables shipped as `identifier = [...];` script literals.
// ABOUTME: Locates the gold and silver arrays, parses them as JSON and maps entries to fields.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::classify::Classifier;
use crate::error::EmbeddedError;
use crate::number::parse_loose;
use crate::record::{FieldKind, PriceFields, SilverTier};

/// Gold entries the positional mapping needs.
pub const MIN_GOLD_ENTRIES: usize = 4;

const GOLD_POSITIONS: [FieldKind; MIN_GOLD_ENTRIES] = [
    FieldKind::Gold22K,
    FieldKind::Gold21K,
    FieldKind::Gold18K,
    FieldKind::GoldTraditional,
];

const SILVER_POSITIONS: [FieldKind; 4] = [
    FieldKind::Silver(SilverTier::Karat22),
    FieldKind::Silver(SilverTier::Karat21),
    FieldKind::Silver(SilverTier::Karat18),
    FieldKind::Silver(SilverTier::Traditional),
];

const NAME_KEYS: &[&str] = &["name", "title", "label", "type", "category", "karat"];
const PRICE_KEYS: &[&str] = &["price", "rate", "value", "sell", "selling_price", "amount"];

/// Identifiers of the script arrays holding each metal's entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedMarkers {
    pub gold: String,
    pub silver: String,
}

impl Default for EmbeddedMarkers {
    fn default() -> Self {
        Self {
            gold: "goldPrices".to_string(),
            silver: "silverPrices".to_string(),
        }
    }
}

/// How array entries are assigned to fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryMapping {
    /// Fixed index order: gold 22K, 21K, 18K, traditional.
    #[default]
    Positional,
    /// Classify each entry's descriptive name.
    ByName,
}

/// One array element reduced to what extraction needs.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedEntry {
    pub name: Option<String>,
    pub price: Option<f64>,
}

/// Find the bracketed text assigned to `ident`, including the brackets.
pub fn locate_array<'a>(raw: &'a str, ident: &str) -> Option<&'a str> {
    let pattern = format!(
        r"(?s)(?:^|[^\w$]){}\s*=\s*(\[.*?\])\s*;",
        regex::escape(ident)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Parse a bracketed literal into entries.
pub fn parse_entries(marker: &str, literal: &str) -> Result<Vec<EmbeddedEntry>, EmbeddedError> {
    let value: Value =
        serde_json::from_str(literal).map_err(|e| EmbeddedError::MalformedArray {
            marker: marker.to_string(),
            reason: e.to_string(),
        })?;
    let Value::Array(items) = value else {
        return Err(EmbeddedError::MalformedArray {
            marker: marker.to_string(),
            reason: "not an array".to_string(),
        });
    };
    Ok(items.iter().map(entry_from_value).collect())
}

fn entry_from_value(value: &Value) -> EmbeddedEntry {
    match value {
        Value::Object(map) => {
            let name = NAME_KEYS
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str))
                .map(str::to_string);
            let price = PRICE_KEYS
                .iter()
                .find_map(|k| map.get(*k).and_then(numeric))
                .or_else(|| map.values().find_map(numeric));
            EmbeddedEntry { name, price }
        }
        Value::Array(items) => EmbeddedEntry {
            name: items
                .iter()
                .find_map(|v| v.as_str().filter(|s| numeric_str(s).is_none()))
                .map(str::to_string),
            price: items.iter().find_map(numeric),
        },
        other => EmbeddedEntry {
            name: None,
            price: numeric(other),
        },
    }
}

/// A positive price carried by a number or a numeric string.
fn numeric(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => numeric_str(s),
        _ => None,
    }?;
    (price > 0.0).then_some(price)
}

/// A string counts as numeric when it has digits and no letters.
fn numeric_str(s: &str) -> Option<f64> {
    if s.chars().any(char::is_alphabetic) {
        return None;
    }
    parse_loose(s)
}

/// Locate and parse both arrays.
///
/// Both markers must be present. The gold array is parsed and its length
/// checked before the silver array is touched, so an insufficient gold array
/// is reported the same way whatever the silver array holds.
pub fn read_arrays(
    raw: &str,
    markers: &EmbeddedMarkers,
) -> Result<(Vec<EmbeddedEntry>, Vec<EmbeddedEntry>), EmbeddedError> {
    let gold_literal = locate_array(raw, &markers.gold)
        .ok_or_else(|| EmbeddedError::MissingMarker(markers.gold.clone()))?;
    let silver_literal = locate_array(raw, &markers.silver)
        .ok_or_else(|| EmbeddedError::MissingMarker(markers.silver.clone()))?;

    let gold = parse_entries(&markers.gold, gold_literal)?;
    if gold.len() < MIN_GOLD_ENTRIES {
        return Err(EmbeddedError::InsufficientEntries {
            marker: markers.gold.clone(),
            found: gold.len(),
            required: MIN_GOLD_ENTRIES,
        });
    }
    let silver = parse_entries(&markers.silver, silver_literal)?;
    Ok((gold, silver))
}

/// Body check used before accepting an embedded source.
///
/// Absent or malformed markers make the body unusable. A short gold array
/// passes here and is reported by extraction instead.
pub fn check_markers(raw: &str, markers: &EmbeddedMarkers) -> Result<(), EmbeddedError> {
    match read_arrays(raw, markers) {
        Ok(_) | Err(EmbeddedError::InsufficientEntries { .. }) => Ok(()),
        Err(err) => Err(err),
    }
}

/// Extract prices from a script payload.
pub fn extract_from_embedded(
    raw: &str,
    markers: &EmbeddedMarkers,
    mapping: EntryMapping,
    classifier: &Classifier,
) -> Result<PriceFields, EmbeddedError> {
    let (gold, silver) = read_arrays(raw, markers)?;
    debug!(
        gold = gold.len(),
        silver = silver.len(),
        ?mapping,
        "parsed embedded arrays"
    );

    let mut fields = PriceFields::default();
    match mapping {
        EntryMapping::Positional => {
            map_positional(&gold, &silver, &mut fields);
        }
        EntryMapping::ByName => {
            map_by_name(&gold, "gold", &mut fields, classifier);
            map_by_name(&silver, "silver", &mut fields, classifier);
        }
    }
    Ok(fields)
}

fn map_positional(gold: &[EmbeddedEntry], silver: &[EmbeddedEntry], fields: &mut PriceFields) {
    for (kind, entry) in GOLD_POSITIONS.iter().zip(gold) {
        if let Some(price) = entry.price {
            fields.set_if_unset(*kind, price);
        }
    }
    if silver.len() >= SILVER_POSITIONS.len() {
        for (kind, entry) in SILVER_POSITIONS.iter().zip(silver) {
            if let Some(price) = entry.price {
                fields.set_if_unset(*kind, price);
            }
        }
    } else if let Some(price) = silver.first().and_then(|e| e.price) {
        fields.set_if_unset(FieldKind::Silver(SilverTier::Reference), price);
    }
}

fn map_by_name(
    entries: &[EmbeddedEntry],
    metal: &str,
    fields: &mut PriceFields,
    classifier: &Classifier,
) {
    for entry in entries {
        let (Some(name), Some(price)) = (entry.name.as_deref(), entry.price) else {
            continue;
        };
        let kinds = classifier.classify(&format!("{} {}", name, metal));
        // "22K silver" also matches the untiered silver rule; prefer the tier
        let kind = kinds
            .iter()
            .copied()
            .find(|k| *k != FieldKind::Silver(SilverTier::Reference))
            .or_else(|| kinds.first().copied());
        if let Some(kind) = kind {
            if fields.set_if_unset(kind, price) {
                debug!(field = %kind, entry = name, value = price, "mapped entry by name");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FOUR_GOLD: &str = r#"var goldPrices = [
        {"name": "22 Karat", "price": "1,52,000"},
        {"name": "21 Karat", "price": 145000},
        {"name": "18 Karat", "price": 124500},
        {"name": "Traditional", "price": 103000}
    ];"#;

    const FOUR_GOLD_WITH_SILVER: &str =
        "goldPrices = [152000, 145000, 124500, 103000];\nsilverPrices = [2500];";

    fn extract(raw: &str, mapping: EntryMapping) -> Result<PriceFields, EmbeddedError> {
        extract_from_embedded(
            raw,
            &EmbeddedMarkers::default(),
            mapping,
            &Classifier::default(),
        )
    }

    #[test]
    fn positional_mapping_fills_gold_and_silver_tiers() {
        let raw = format!(
            "{}\nconst silverPrices = [2500, 2380, 2040, 1530];",
            FOUR_GOLD
        );
        let fields = extract(&raw, EntryMapping::Positional).unwrap();
        assert_eq!(fields.get(FieldKind::Gold22K), Some(152000.0));
        assert_eq!(fields.get(FieldKind::Gold21K), Some(145000.0));
        assert_eq!(fields.get(FieldKind::Gold18K), Some(124500.0));
        assert_eq!(fields.get(FieldKind::GoldTraditional), Some(103000.0));
        assert_eq!(fields.get(FieldKind::Silver(SilverTier::Karat22)), Some(2500.0));
        assert_eq!(
            fields.get(FieldKind::Silver(SilverTier::Traditional)),
            Some(1530.0)
        );
        assert_eq!(fields.get(FieldKind::Silver(SilverTier::Reference)), None);
        assert_eq!(fields.get(FieldKind::Gold24K), None);
    }

    #[test]
    fn short_silver_array_gives_reference_value() {
        let raw = format!("{}\nsilverPrices = [[\"Silver\", 2450]];", FOUR_GOLD);
        let fields = extract(&raw, EntryMapping::Positional).unwrap();
        assert_eq!(
            fields.get(FieldKind::Silver(SilverTier::Reference)),
            Some(2450.0)
        );
        assert_eq!(fields.get(FieldKind::Silver(SilverTier::Karat22)), None);
    }

    #[test]
    fn empty_silver_array_leaves_silver_unset() {
        let raw = format!("{}\nsilverPrices = [];", FOUR_GOLD);
        let fields = extract(&raw, EntryMapping::Positional).unwrap();
        assert!(fields.observed().iter().all(|k| !k.is_silver()));
        assert!(fields.is_set(FieldKind::Gold22K));
    }

    #[test]
    fn missing_silver_marker_fails_even_with_four_gold_entries() {
        let err = extract(FOUR_GOLD, EntryMapping::Positional).unwrap_err();
        assert_eq!(err, EmbeddedError::MissingMarker("silverPrices".into()));
    }

    #[test]
    fn missing_gold_marker_fails() {
        let err = extract("silverPrices = [1];", EntryMapping::Positional).unwrap_err();
        assert_eq!(err, EmbeddedError::MissingMarker("goldPrices".into()));
    }

    #[test]
    fn short_gold_array_fails_regardless_of_silver() {
        for silver in ["[]", "[1, 2, 3, 4, 5]", "[not json]"] {
            let raw = format!("goldPrices = [1, 2, 3];\nsilverPrices = {};", silver);
            let err = extract(&raw, EntryMapping::Positional).unwrap_err();
            assert_eq!(
                err,
                EmbeddedError::InsufficientEntries {
                    marker: "goldPrices".into(),
                    found: 3,
                    required: 4
                },
                "silver literal {silver}"
            );
        }
    }

    #[test]
    fn non_json_gold_literal_is_malformed() {
        let raw = "goldPrices = [{name: '22K', price: 1}];\nsilverPrices = [];";
        let err = extract(raw, EntryMapping::Positional).unwrap_err();
        assert!(matches!(
            err,
            EmbeddedError::MalformedArray { ref marker, .. } if marker == "goldPrices"
        ));
    }

    #[test]
    fn identifier_must_match_whole_word() {
        assert_eq!(locate_array("oldgoldPrices = [1];", "goldPrices"), None);
        assert_eq!(locate_array("window.goldPrices=[1,2];", "goldPrices"), Some("[1,2]"));
    }

    #[test]
    fn nested_arrays_are_captured_whole() {
        let raw = r#"let goldPrices = [["22K", 1], ["21K", 2]]; var x = 1;"#;
        assert_eq!(
            locate_array(raw, "goldPrices"),
            Some(r#"[["22K", 1], ["21K", 2]]"#)
        );
    }

    #[test]
    fn by_name_mapping_survives_reordering() {
        let raw = r#"goldPrices = [
            {"title": "18K", "rate": 124500},
            {"title": "Traditional", "rate": 103000},
            {"title": "22K", "rate": 152000},
            {"title": "21K", "rate": 145000}
        ];
        silverPrices = [["22K", 2500], ["Traditional", 1530]];"#;
        let fields = extract(raw, EntryMapping::ByName).unwrap();
        assert_eq!(fields.get(FieldKind::Gold22K), Some(152000.0));
        assert_eq!(fields.get(FieldKind::Gold18K), Some(124500.0));
        assert_eq!(fields.get(FieldKind::GoldTraditional), Some(103000.0));
        assert_eq!(fields.get(FieldKind::Silver(SilverTier::Karat22)), Some(2500.0));
        assert_eq!(
            fields.get(FieldKind::Silver(SilverTier::Traditional)),
            Some(1530.0)
        );
    }

    #[test]
    fn entry_shapes() {
        let entries =
            parse_entries("m", r#"[12.5, "৭৮,৫০০", ["22K", "1,000"], {"karat": "21K", "x": 9}]"#)
                .unwrap();
        assert_eq!(entries[0].price, Some(12.5));
        assert_eq!(entries[1].price, Some(78500.0));
        assert_eq!(entries[2].name.as_deref(), Some("22K"));
        assert_eq!(entries[2].price, Some(1000.0));
        assert_eq!(entries[3].name.as_deref(), Some("21K"));
        assert_eq!(entries[3].price, Some(9.0));
    }

    #[test]
    fn marker_check_rejects_absent_or_malformed_arrays() {
        let markers = EmbeddedMarkers::default();
        assert!(matches!(
            check_markers("var trackers = [1, 2];", &markers),
            Err(EmbeddedError::MissingMarker(m)) if m == "goldPrices"
        ));
        assert!(matches!(
            check_markers(
                "goldPrices = [1, 2, 3, 4]; silverPrices = [oops];",
                &markers
            ),
            Err(EmbeddedError::MalformedArray { .. })
        ));
        // a short gold array is left for extraction to report
        assert!(check_markers("goldPrices = [1]; silverPrices = [2];", &markers).is_ok());
        assert!(check_markers(FOUR_GOLD_WITH_SILVER, &markers).is_ok());
    }

    #[test]
    fn non_positive_entries_are_not_prices() {
        let raw = "goldPrices = [\"-152000\", 145000, 0, 103000];\nsilverPrices = [-2500];";
        let fields = extract(raw, EntryMapping::Positional).unwrap();
        assert_eq!(fields.get(FieldKind::Gold22K), None);
        assert_eq!(fields.get(FieldKind::Gold21K), Some(145000.0));
        assert_eq!(fields.get(FieldKind::Gold18K), None);
        assert_eq!(fields.get(FieldKind::Silver(SilverTier::Reference)), None);
    }
}
