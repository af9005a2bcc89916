//! Persistent per-question answer memory.
//!
//! Each question is keyed by its [`QuestionKey`] and remembers the correct
//! option (once known), options known to be wrong, and the union of every
//! option ever seen for it. Set membership always uses text equivalence, so
//! near-duplicate renderings collapse into one member.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::SnapshotStore;
use crate::text::{normalize, same_text, QuestionKey, TextVariant};

/// The whole persisted memory.
pub type MemoryMap = BTreeMap<QuestionKey, MemoryEntry>;

/// One member of the `wrong` list.
///
/// Older memory stored wrong answers as indices into the option order of the
/// session that recorded them. Those are kept as [`WrongMark::Index`] until an
/// encounter with the question supplies the options to rewrite them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WrongMark {
    Text(TextVariant),
    Index(i64),
}

impl WrongMark {
    pub fn as_text(&self) -> Option<&TextVariant> {
        match self {
            WrongMark::Text(t) => Some(t),
            WrongMark::Index(_) => None,
        }
    }
}

/// Learned knowledge about one question.
///
/// Deserialization never fails: malformed fields are repaired to their empty
/// form so one damaged entry cannot take the rest of the memory with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemoryEntry {
    /// The most complete rendering of the question seen so far.
    #[serde(rename = "qRaw", skip_serializing_if = "Option::is_none")]
    pub question_raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<TextVariant>,
    pub wrong: Vec<WrongMark>,
    /// Every option ever observed for this question.
    pub options: Vec<TextVariant>,
    /// Legacy index of the correct option.
    #[serde(rename = "correctIndex", skip_serializing_if = "Option::is_none")]
    pub correct_index: Option<i64>,
}

impl<'de> Deserialize<'de> for MemoryEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(MemoryEntry::repair(Value::deserialize(deserializer)?))
    }
}

/// Read a text variant, accepting a bare string or a variant with missing
/// comparison forms by re-deriving them from `raw`.
fn variant_from(value: &Value) -> Option<TextVariant> {
    match value {
        Value::String(s) => Some(normalize(s)),
        Value::Object(obj) => match serde_json::from_value::<TextVariant>(value.clone()) {
            Ok(t) => Some(t),
            Err(_) => obj.get("raw").and_then(Value::as_str).map(normalize),
        },
        _ => None,
    }
}

fn index_from(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn array_of<T>(value: Option<&Value>, f: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(f).collect(),
        _ => Vec::new(),
    }
}

impl MemoryEntry {
    /// Build an entry from whatever JSON was stored for it.
    fn repair(value: Value) -> Self {
        let Value::Object(obj) = value else {
            warn!("memory entry is not an object, resetting it");
            return MemoryEntry::default();
        };
        MemoryEntry {
            question_raw: obj
                .get("qRaw")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            correct: obj.get("correct").and_then(variant_from),
            wrong: array_of(obj.get("wrong"), |w| match w {
                Value::Number(_) => index_from(w).map(WrongMark::Index),
                other => variant_from(other).map(WrongMark::Text),
            }),
            options: array_of(obj.get("options"), variant_from),
            correct_index: obj.get("correctIndex").and_then(index_from),
        }
    }
}

/// Append `t` unless it is blank or equivalent to an existing member.
/// Returns `true` if it was added.
fn push_unique(items: &mut Vec<TextVariant>, t: TextVariant) -> bool {
    if t.is_blank() || items.iter().any(|x| same_text(x, &t)) {
        return false;
    }
    items.push(t);
    true
}

impl MemoryEntry {
    /// Wrong answers already in text form.
    pub fn wrong_texts(&self) -> impl Iterator<Item = &TextVariant> {
        self.wrong.iter().filter_map(WrongMark::as_text)
    }

    /// Whether `t` is equivalent to a known wrong answer.
    pub fn is_known_wrong(&self, t: &TextVariant) -> bool {
        self.wrong_texts().any(|w| same_text(w, t))
    }

    /// Whether this entry still carries index-based fields.
    pub fn is_legacy(&self) -> bool {
        self.correct_index.is_some() || self.wrong.iter().any(|w| matches!(w, WrongMark::Index(_)))
    }

    /// The known correct answer, if it is not blank.
    pub fn known_correct(&self) -> Option<&TextVariant> {
        self.correct.as_ref().filter(|c| !c.is_blank())
    }

    fn add_option(&mut self, t: TextVariant) -> bool {
        push_unique(&mut self.options, t)
    }

    fn add_wrong(&mut self, t: TextVariant) -> bool {
        if t.is_blank() || self.is_known_wrong(&t) {
            return false;
        }
        self.wrong.push(WrongMark::Text(t));
        true
    }

    /// Rewrite legacy index fields into text form using the options observed
    /// in the current encounter, in their current order. The current options
    /// are merged into `options` as well.
    ///
    /// Safe to call on entries that are already migrated or only partly so.
    /// Wrong indices that do not address a current option are dropped; a
    /// correct index that does not resolve is kept for a later encounter.
    pub fn migrate(&mut self, current_options: &[String]) {
        for raw in current_options {
            self.add_option(normalize(raw));
        }
        if let Some(correct) = self.known_correct().cloned() {
            self.add_option(correct);
        }

        if let Some(idx) = self.correct_index {
            if self.known_correct().is_some() {
                self.correct_index = None;
            } else if let Some(raw) = option_at(current_options, idx) {
                let t = normalize(raw);
                self.correct = Some(t.clone());
                self.add_option(t);
                self.correct_index = None;
            }
        }

        if self.wrong.iter().any(|w| matches!(w, WrongMark::Index(_))) {
            let marks = std::mem::take(&mut self.wrong);
            for mark in marks {
                let t = match mark {
                    WrongMark::Text(t) => t,
                    WrongMark::Index(i) => match option_at(current_options, i) {
                        Some(raw) => normalize(raw),
                        None => continue,
                    },
                };
                self.add_option(t.clone());
                self.add_wrong(t);
            }
        }
    }
}

fn option_at(options: &[String], idx: i64) -> Option<&String> {
    usize::try_from(idx).ok().and_then(|i| options.get(i))
}

/// Aggregate counts over the whole memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Number of questions stored.
    pub total: usize,
    /// Questions with a known correct answer.
    pub with_correct: usize,
    /// Questions with at least one known wrong answer.
    pub with_wrong: usize,
    /// Total number of known wrong answers.
    pub wrong_choices: usize,
    /// Questions with at least one recorded option.
    pub with_options: usize,
}

impl MemoryStats {
    pub fn compute(map: &MemoryMap) -> Self {
        let mut stats = MemoryStats {
            total: map.len(),
            ..Default::default()
        };
        for entry in map.values() {
            if entry.known_correct().is_some() {
                stats.with_correct += 1;
            }
            if !entry.wrong.is_empty() {
                stats.with_wrong += 1;
                stats.wrong_choices += entry.wrong.len();
            }
            if !entry.options.is_empty() {
                stats.with_options += 1;
            }
        }
        stats
    }
}

/// Read-modify-write access to the persisted memory map.
///
/// Every mutating call loads the whole map, applies one change, and saves the
/// whole map before returning.
#[derive(Clone)]
pub struct MemoryRepository {
    store: Arc<dyn SnapshotStore<MemoryMap>>,
}

impl MemoryRepository {
    pub fn new(store: Arc<dyn SnapshotStore<MemoryMap>>) -> Self {
        Self { store }
    }

    /// Load the whole map.
    pub fn snapshot(&self) -> Result<MemoryMap> {
        self.store.load()
    }

    pub fn get(&self, key: &QuestionKey) -> Result<Option<MemoryEntry>> {
        Ok(self.store.load()?.remove(key))
    }

    fn update<R>(&self, key: &QuestionKey, f: impl FnOnce(&mut MemoryEntry) -> R) -> Result<R> {
        let mut map = self.store.load()?;
        let entry = map.entry(key.clone()).or_default();
        let out = f(entry);
        self.store.save(&map)?;
        Ok(out)
    }

    /// Create an empty entry if none exists.
    pub fn ensure_entry(&self, key: &QuestionKey) -> Result<()> {
        self.update(key, |_| ())
    }

    /// Record the correct answer; it is also added to the options.
    pub fn set_correct(&self, key: &QuestionKey, raw: &str) -> Result<()> {
        let t = normalize(raw);
        self.update(key, |e| {
            e.correct = Some(t.clone());
            e.correct_index = None;
            e.add_option(t);
        })?;
        info!(%key, answer = raw, "learned correct answer");
        Ok(())
    }

    /// Record a wrong answer. Returns `true` if it was not already known.
    pub fn add_wrong(&self, key: &QuestionKey, raw: &str) -> Result<bool> {
        let t = normalize(raw);
        let added = self.update(key, |e| {
            e.add_option(t.clone());
            e.add_wrong(t)
        })?;
        if added {
            info!(%key, answer = raw, "learned wrong answer");
        }
        Ok(added)
    }

    /// Add every text to the options, deduplicated by equivalence.
    pub fn merge_options<S: AsRef<str>>(&self, key: &QuestionKey, raws: &[S]) -> Result<usize> {
        let added = self.update(key, |e| {
            let mut added = 0;
            for raw in raws {
                if e.add_option(normalize(raw.as_ref())) {
                    added += 1;
                }
            }
            added
        })?;
        debug!(%key, added, "merged options");
        Ok(added)
    }

    /// Keep the longest rendering of the question.
    pub fn set_question_raw(&self, key: &QuestionKey, raw: &str) -> Result<()> {
        self.update(key, |e| {
            let longer = e
                .question_raw
                .as_ref()
                .map_or(true, |cur| cur.chars().count() < raw.chars().count());
            if !raw.is_empty() && longer {
                e.question_raw = Some(raw.to_string());
            }
        })
    }

    /// Migrate a stored legacy entry using the options of this encounter.
    /// Returns `true` if the entry had legacy fields.
    pub fn migrate(&self, key: &QuestionKey, current_options: &[String]) -> Result<bool> {
        let mut map = self.store.load()?;
        let Some(entry) = map.get_mut(key) else {
            return Ok(false);
        };
        if !entry.is_legacy() {
            return Ok(false);
        }
        entry.migrate(current_options);
        self.store.save(&map)?;
        info!(%key, "migrated legacy memory entry");
        Ok(true)
    }

    pub fn stats(&self) -> Result<MemoryStats> {
        Ok(MemoryStats::compute(&self.store.load()?))
    }

    /// Delete every stored question.
    pub fn clear_all(&self) -> Result<()> {
        self.store.clear()?;
        info!("memory cleared");
        Ok(())
    }
}
