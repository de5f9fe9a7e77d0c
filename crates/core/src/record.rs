// ABOUTME: PriceRecord and FieldKind, the unit of output of one scrape cycle.
// ABOUTME: Prices are stored one f64 per field with 0.0 as the "not observed" sentinel.

use std::fmt;

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};

/// Source tag carried by synthetic records from the fallback provider.
pub const FALLBACK_SOURCE: &str = "fallback:static-estimate";

/// Silver reference tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SilverTier {
    /// A single untiered silver quote.
    Reference,
    Karat22,
    Karat21,
    Karat18,
    Traditional,
}

/// Every price field a record can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKind {
    Gold22K,
    Gold21K,
    Gold18K,
    Gold24K,
    GoldTraditional,
    Silver(SilverTier),
}

impl FieldKind {
    /// All fields in persisted column order.
    pub const ALL: [FieldKind; 10] = [
        FieldKind::Gold22K,
        FieldKind::Gold21K,
        FieldKind::Gold18K,
        FieldKind::Gold24K,
        FieldKind::GoldTraditional,
        FieldKind::Silver(SilverTier::Reference),
        FieldKind::Silver(SilverTier::Karat22),
        FieldKind::Silver(SilverTier::Karat21),
        FieldKind::Silver(SilverTier::Karat18),
        FieldKind::Silver(SilverTier::Traditional),
    ];

    /// The field whose presence makes a record acceptable.
    pub const PRIMARY: FieldKind = FieldKind::Gold22K;

    pub fn is_silver(&self) -> bool {
        matches!(self, FieldKind::Silver(_))
    }

    /// CSV header label.
    pub fn column(&self) -> &'static str {
        match self {
            FieldKind::Gold22K => "Gold_22K",
            FieldKind::Gold21K => "Gold_21K",
            FieldKind::Gold18K => "Gold_18K",
            FieldKind::Gold24K => "Gold_24K",
            FieldKind::GoldTraditional => "Gold_Traditional",
            FieldKind::Silver(SilverTier::Reference) => "Silver",
            FieldKind::Silver(SilverTier::Karat22) => "Silver_22K",
            FieldKind::Silver(SilverTier::Karat21) => "Silver_21K",
            FieldKind::Silver(SilverTier::Karat18) => "Silver_18K",
            FieldKind::Silver(SilverTier::Traditional) => "Silver_Traditional",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldKind::Gold22K => "gold 22K",
            FieldKind::Gold21K => "gold 21K",
            FieldKind::Gold18K => "gold 18K",
            FieldKind::Gold24K => "gold 24K",
            FieldKind::GoldTraditional => "gold traditional",
            FieldKind::Silver(SilverTier::Reference) => "silver",
            FieldKind::Silver(SilverTier::Karat22) => "silver 22K",
            FieldKind::Silver(SilverTier::Karat21) => "silver 21K",
            FieldKind::Silver(SilverTier::Karat18) => "silver 18K",
            FieldKind::Silver(SilverTier::Traditional) => "silver traditional",
        };
        write!(f, "{}", s)
    }
}

/// Observed prices, one slot per [`FieldKind`].
///
/// A slot holding `0.0` has not been observed. A genuinely zero price cannot
/// be represented; no metal listing ever quotes one. Serialized keys match
/// the history files written by earlier versions (`silver_price` for the
/// reference silver quote), and keys missing on load stay unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceFields {
    #[serde(default)]
    pub gold_22k: f64,
    #[serde(default)]
    pub gold_21k: f64,
    #[serde(default)]
    pub gold_18k: f64,
    #[serde(default)]
    pub gold_24k: f64,
    #[serde(default)]
    pub gold_traditional: f64,
    #[serde(default, rename = "silver_price")]
    pub silver: f64,
    #[serde(default)]
    pub silver_22k: f64,
    #[serde(default)]
    pub silver_21k: f64,
    #[serde(default)]
    pub silver_18k: f64,
    #[serde(default)]
    pub silver_traditional: f64,
}

impl PriceFields {
    fn slot(&self, kind: FieldKind) -> f64 {
        match kind {
            FieldKind::Gold22K => self.gold_22k,
            FieldKind::Gold21K => self.gold_21k,
            FieldKind::Gold18K => self.gold_18k,
            FieldKind::Gold24K => self.gold_24k,
            FieldKind::GoldTraditional => self.gold_traditional,
            FieldKind::Silver(SilverTier::Reference) => self.silver,
            FieldKind::Silver(SilverTier::Karat22) => self.silver_22k,
            FieldKind::Silver(SilverTier::Karat21) => self.silver_21k,
            FieldKind::Silver(SilverTier::Karat18) => self.silver_18k,
            FieldKind::Silver(SilverTier::Traditional) => self.silver_traditional,
        }
    }

    fn slot_mut(&mut self, kind: FieldKind) -> &mut f64 {
        match kind {
            FieldKind::Gold22K => &mut self.gold_22k,
            FieldKind::Gold21K => &mut self.gold_21k,
            FieldKind::Gold18K => &mut self.gold_18k,
            FieldKind::Gold24K => &mut self.gold_24k,
            FieldKind::GoldTraditional => &mut self.gold_traditional,
            FieldKind::Silver(SilverTier::Reference) => &mut self.silver,
            FieldKind::Silver(SilverTier::Karat22) => &mut self.silver_22k,
            FieldKind::Silver(SilverTier::Karat21) => &mut self.silver_21k,
            FieldKind::Silver(SilverTier::Karat18) => &mut self.silver_18k,
            FieldKind::Silver(SilverTier::Traditional) => &mut self.silver_traditional,
        }
    }

    /// The observed value, or `None` while the slot is unset.
    pub fn get(&self, kind: FieldKind) -> Option<f64> {
        let v = self.slot(kind);
        if v == 0.0 {
            None
        } else {
            Some(v)
        }
    }

    pub fn is_set(&self, kind: FieldKind) -> bool {
        self.get(kind).is_some()
    }

    /// Set a field unless it already holds a value. Returns true when written.
    ///
    /// Only finite positive values are written; zero means unset and a
    /// negative or non-finite number is never a price.
    pub fn set_if_unset(&mut self, kind: FieldKind, value: f64) -> bool {
        if !value.is_finite() || value <= 0.0 {
            return false;
        }
        let slot = self.slot_mut(kind);
        if *slot != 0.0 {
            return false;
        }
        *slot = value;
        true
    }

    /// Fields currently holding a value, in column order.
    pub fn observed(&self) -> Vec<FieldKind> {
        FieldKind::ALL
            .iter()
            .copied()
            .filter(|k| self.is_set(*k))
            .collect()
    }
}

/// One observation, as persisted to CSV and JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub date: String,
    pub time: String,
    #[serde(flatten)]
    pub prices: PriceFields,
    #[serde(default)]
    pub currency: String,
    pub source: String,
}

impl PriceRecord {
    /// Create an empty record captured at `captured_at`.
    pub fn new(
        captured_at: DateTime<FixedOffset>,
        source: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: captured_at,
            date: captured_at.format("%Y-%m-%d").to_string(),
            time: captured_at.format("%H:%M:%S").to_string(),
            prices: PriceFields::default(),
            currency: currency.into(),
            source: source.into(),
        }
    }

    /// Create an empty record stamped with the local wall clock.
    pub fn captured_now(source: impl Into<String>, currency: impl Into<String>) -> Self {
        Self::new(Local::now().fixed_offset(), source, currency)
    }

    pub fn get(&self, kind: FieldKind) -> Option<f64> {
        self.prices.get(kind)
    }

    pub fn set_if_unset(&mut self, kind: FieldKind, value: f64) -> bool {
        self.prices.set_if_unset(kind, value)
    }

    /// True when the primary field was observed.
    pub fn is_complete(&self) -> bool {
        self.prices.is_set(FieldKind::PRIMARY)
    }

    pub fn is_fallback(&self) -> bool {
        self.source == FALLBACK_SOURCE
    }
}
