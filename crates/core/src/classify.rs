// ABOUTME: Keyword classifier mapping a text fragment to the price fields it may describe.
// ABOUTME: Rules are built from an extensible synonym vocabulary (English, Bengali script, transliterations).

//! Field classification.
//!
//! A [`Rule`] names a [`FieldKind`] and the [`Term`]s that must (and must not)
//! appear in a fragment for it to match. Terms resolve through a vocabulary of
//! synonyms, so new spellings are added with [`Classifier::add_synonym`]
//! without touching rules or callers.
//!
//! Karat terms only match as standalone numbers: the `22` inside `2022` or
//! `1,22,000` is not a karat token.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::number::is_digit;
use crate::record::{FieldKind, SilverTier};

/// A vocabulary entry a rule can require or exclude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Term {
    Gold,
    Silver,
    Traditional,
    /// A purity tier written as a number, e.g. 22 for "22K".
    Karat(u8),
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Gold => write!(f, "gold"),
            Term::Silver => write!(f, "silver"),
            Term::Traditional => write!(f, "traditional"),
            Term::Karat(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for Term {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "gold" => Ok(Term::Gold),
            "silver" => Ok(Term::Silver),
            "traditional" => Ok(Term::Traditional),
            other => {
                let digits = other.trim_end_matches('k');
                digits
                    .parse::<u8>()
                    .map(Term::Karat)
                    .map_err(|_| format!("unknown classifier term `{}`", s))
            }
        }
    }
}

/// Requirements for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub kind: FieldKind,
    pub requires: Vec<Term>,
    pub excludes: Vec<Term>,
}

impl Rule {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            requires: Vec::new(),
            excludes: Vec::new(),
        }
    }

    pub fn requires(mut self, term: Term) -> Self {
        self.requires.push(term);
        self
    }

    pub fn excludes(mut self, term: Term) -> Self {
        self.excludes.push(term);
        self
    }
}

/// Synonym vocabulary plus the ordered rule list.
#[derive(Debug, Clone)]
pub struct Classifier {
    vocabulary: HashMap<Term, Vec<String>>,
    rules: Vec<Rule>,
}

const GOLD_WORDS: &[&str] = &["gold", "সোনা", "স্বর্ণ", "sona", "shona", "swarna"];
const SILVER_WORDS: &[&str] = &["silver", "রুপা", "রূপা", "rupa", "chandi"];
const TRADITIONAL_WORDS: &[&str] = &["traditional", "সনাতন", "sonaton", "sanatan"];
const KARATS: &[(u8, &str)] = &[(22, "২২"), (21, "২১"), (18, "১৮"), (24, "২৪")];

impl Default for Classifier {
    fn default() -> Self {
        let mut c = Self::empty();
        for w in GOLD_WORDS {
            c.add_synonym(Term::Gold, w);
        }
        for w in SILVER_WORDS {
            c.add_synonym(Term::Silver, w);
        }
        for w in TRADITIONAL_WORDS {
            c.add_synonym(Term::Traditional, w);
        }
        for (karat, bengali) in KARATS {
            c.add_synonym(Term::Karat(*karat), &karat.to_string());
            c.add_synonym(Term::Karat(*karat), bengali);
        }

        let gold_tiers = [
            (FieldKind::Gold22K, 22),
            (FieldKind::Gold21K, 21),
            (FieldKind::Gold18K, 18),
            (FieldKind::Gold24K, 24),
        ];
        for (kind, karat) in gold_tiers {
            c.push_rule(Rule::new(kind).requires(Term::Karat(karat)).requires(Term::Gold));
        }
        c.push_rule(
            Rule::new(FieldKind::GoldTraditional)
                .requires(Term::Traditional)
                .excludes(Term::Silver),
        );
        c.push_rule(Rule::new(FieldKind::Silver(SilverTier::Reference)).requires(Term::Silver));
        let silver_tiers = [
            (SilverTier::Karat22, 22),
            (SilverTier::Karat21, 21),
            (SilverTier::Karat18, 18),
        ];
        for (tier, karat) in silver_tiers {
            c.push_rule(
                Rule::new(FieldKind::Silver(tier))
                    .requires(Term::Karat(karat))
                    .requires(Term::Silver)
                    .excludes(Term::Gold),
            );
        }
        c.push_rule(
            Rule::new(FieldKind::Silver(SilverTier::Traditional))
                .requires(Term::Traditional)
                .requires(Term::Silver)
                .excludes(Term::Gold),
        );
        c
    }
}

impl Classifier {
    /// A classifier with no vocabulary and no rules.
    pub fn empty() -> Self {
        Self {
            vocabulary: HashMap::new(),
            rules: Vec::new(),
        }
    }

    /// Register another spelling for `term`. Matching is case-insensitive.
    pub fn add_synonym(&mut self, term: Term, word: &str) {
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            return;
        }
        let words = self.vocabulary.entry(term).or_default();
        if !words.contains(&word) {
            words.push(word);
        }
    }

    /// Append a rule; rules are evaluated in insertion order.
    pub fn push_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Fields `text` may describe, in rule order.
    pub fn classify(&self, text: &str) -> Vec<FieldKind> {
        let lowered = text.to_lowercase();
        if lowered.is_empty() {
            return Vec::new();
        }
        let mut found: HashMap<Term, bool> = HashMap::new();
        let mut present = |term: Term| -> bool {
            *found
                .entry(term)
                .or_insert_with(|| self.first_position(&lowered, term).is_some())
        };

        let mut out = Vec::new();
        for rule in &self.rules {
            if rule.requires.is_empty() {
                continue;
            }
            if rule.excludes.iter().any(|t| present(*t)) {
                continue;
            }
            if rule.requires.iter().all(|t| present(*t)) {
                out.push(rule.kind);
            }
        }
        out
    }

    /// Earliest byte offset of any synonym of `term` in `lowered`.
    fn first_position(&self, lowered: &str, term: Term) -> Option<usize> {
        let words = self.vocabulary.get(&term)?;
        let numeric = matches!(term, Term::Karat(_));
        words
            .iter()
            .filter_map(|w| {
                if numeric {
                    find_standalone_number(lowered, w)
                } else {
                    lowered.find(w.as_str())
                }
            })
            .min()
    }
}

/// Find `needle` in `haystack` where it is not part of a longer number.
///
/// Neighbouring digits disqualify a hit, as do `,` or `.` that join it to
/// more digits (`1,22,000`, `3.22`).
fn find_standalone_number(haystack: &str, needle: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = haystack[from..].find(needle) {
        let start = from + rel;
        let end = start + needle.len();
        if !joins_number(haystack[..start].chars().rev())
            && !joins_number(haystack[end..].chars())
        {
            return Some(start);
        }
        from = start + haystack[start..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// True when the characters walking away from a match continue a number.
fn joins_number(mut chars: impl Iterator<Item = char>) -> bool {
    match chars.next() {
        Some(c) if is_digit(c) => true,
        Some(',') | Some('.') => chars.next().is_some_and(is_digit),
        _ => false,
    }
}
