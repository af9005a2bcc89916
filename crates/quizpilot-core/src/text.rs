//! Text normalization and equivalence.
//!
//! The same question or option is rendered slightly differently across page
//! views (smart quotes, trailing punctuation, precomposed vs. combining
//! accents). Everything that is compared or used as a key goes through
//! [`normalize`] first.

use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Maximum length of a [`QuestionKey`], in characters.
pub const MAX_KEY_CHARS: usize = 400;

/// Characters replaced by a space before comparison.
const STRIPPED_PUNCTUATION: &[char] = &[
    '\u{201C}', '\u{201D}', '"', '\'', ':', ',', '.', '!', '?', '(', ')', '[', ']', '{', '}',
    '\u{2022}', '*', '<', '>', '/', '\\', '|', ';', '~', '^', '`', '+', '=', '_', '-',
];

/// A raw text value together with its two comparison forms.
///
/// Serialized with the compact field names `raw`, `n` and `na` so stored
/// memory stays readable by older exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextVariant {
    /// The text as it was observed.
    pub raw: String,
    /// Whitespace-collapsed, lowercased, punctuation-stripped form.
    #[serde(rename = "n")]
    pub normalized: String,
    /// `normalized` with combining diacritics removed.
    #[serde(rename = "na")]
    pub no_diacritics: String,
}

impl TextVariant {
    /// Returns `true` if both comparison forms are empty.
    pub fn is_blank(&self) -> bool {
        self.normalized.is_empty()
    }

    /// Two variants are equivalent when either comparison form matches.
    pub fn same_as(&self, other: &TextVariant) -> bool {
        same_text(self, other)
    }
}

/// Collapse every whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove combining diacritical marks (U+0300..=U+036F) after canonical
/// decomposition.
pub fn strip_diacritics(s: &str) -> String {
    s.nfd()
        .filter(|c| !('\u{0300}'..='\u{036F}').contains(c))
        .collect()
}

/// Normalize raw text into a [`TextVariant`].
///
/// Empty input yields empty comparison forms; callers reject empty questions
/// and options before they get here.
pub fn normalize(raw: &str) -> TextVariant {
    let lowered = collapse_whitespace(raw).to_lowercase();
    let depunctuated: String = lowered
        .chars()
        .map(|c| if STRIPPED_PUNCTUATION.contains(&c) { ' ' } else { c })
        .collect();
    let normalized = collapse_whitespace(&depunctuated);
    let no_diacritics = strip_diacritics(&normalized);

    TextVariant {
        raw: raw.to_string(),
        normalized,
        no_diacritics,
    }
}

/// Equivalence used for every set membership test in memory.
pub fn same_text(a: &TextVariant, b: &TextVariant) -> bool {
    a.normalized == b.normalized || a.no_diacritics == b.no_diacritics
}

/// Position of the first variant in `items` equivalent to `needle`.
pub fn position_of(items: &[TextVariant], needle: &TextVariant) -> Option<usize> {
    items.iter().position(|t| same_text(t, needle))
}

/// Deterministic identifier of a question in memory.
///
/// Derived from the diacritic-free form (falling back to the normalized form)
/// and truncated to [`MAX_KEY_CHARS`]. Long questions sharing a truncated
/// prefix collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionKey(String);

impl QuestionKey {
    /// Derive the key for a raw question text.
    pub fn from_question(question: &str) -> Self {
        Self::from_variant(&normalize(question))
    }

    /// Derive the key from an already normalized question.
    pub fn from_variant(variant: &TextVariant) -> Self {
        let base = if variant.no_diacritics.is_empty() {
            &variant.normalized
        } else {
            &variant.no_diacritics
        };
        QuestionKey(base.chars().take(MAX_KEY_CHARS).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
