//! Decision engine.
//!
//! Resolves one question to an option index, preferring what memory already
//! knows and spending at most one inference call per question, always scoped
//! to the options not yet known to be wrong.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{QuizError, Result};
use crate::memory::MemoryRepository;
use crate::text::{normalize, same_text, QuestionKey, TextVariant};
use crate::traits::AnswerSelector;

/// How a question was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// A remembered correct answer matched a current option.
    Memory,
    /// Known-wrong elimination left a single option.
    Elimination,
    /// The inference service picked among the remaining options.
    Inference,
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionSource::Memory => write!(f, "memory"),
            ResolutionSource::Elimination => write!(f, "elimination"),
            ResolutionSource::Inference => write!(f, "inference"),
        }
    }
}

/// Outcome of [`DecisionEngine::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Position in the option list as presented.
    pub chosen_index: usize,
    pub chosen_text: String,
    pub used_inference: bool,
    pub source: ResolutionSource,
}

/// An option with its position as presented.
struct Candidate<'a> {
    index: usize,
    raw: &'a str,
    text: TextVariant,
}

pub struct DecisionEngine {
    memory: MemoryRepository,
    selector: Arc<dyn AnswerSelector>,
}

impl DecisionEngine {
    pub fn new(memory: MemoryRepository, selector: Arc<dyn AnswerSelector>) -> Self {
        Self { memory, selector }
    }

    pub fn memory(&self) -> &MemoryRepository {
        &self.memory
    }

    /// Choose an option for `question`.
    ///
    /// The question and its options are recorded in memory before any
    /// resolution is attempted, and stay recorded even if resolution fails.
    #[instrument(skip_all, fields(options = options.len()))]
    pub async fn resolve(&self, question: &str, options: &[String]) -> Result<Resolution> {
        if normalize(question).is_blank() {
            return Err(QuizError::Extraction("question text is empty".into()));
        }
        if options.is_empty() {
            return Err(QuizError::Extraction("no options to choose from".into()));
        }

        let key = QuestionKey::from_question(question);
        self.memory.set_question_raw(&key, question)?;
        self.memory.merge_options(&key, options)?;
        self.memory.migrate(&key, options)?;

        let entry = self.memory.get(&key)?.unwrap_or_default();
        let candidates: Vec<Candidate<'_>> = options
            .iter()
            .enumerate()
            .map(|(index, raw)| Candidate {
                index,
                raw: raw.as_str(),
                text: normalize(raw),
            })
            .collect();

        if let Some(correct) = entry.known_correct() {
            if let Some(hit) = candidates.iter().find(|c| same_text(&c.text, correct)) {
                info!(%key, index = hit.index, "answered from memory");
                return Ok(resolution(hit, ResolutionSource::Memory));
            }
            debug!(%key, "remembered answer not among current options");
        }

        let mut allowed: Vec<&Candidate<'_>> = candidates
            .iter()
            .filter(|c| !entry.is_known_wrong(&c.text))
            .collect();
        if allowed.is_empty() {
            debug!(%key, "every option is marked wrong, offering all of them");
            allowed = candidates.iter().collect();
        }

        if let [only] = allowed.as_slice() {
            info!(%key, index = only.index, "answered by elimination");
            return Ok(resolution(only, ResolutionSource::Elimination));
        }

        let reduced: Vec<String> = allowed.iter().map(|c| c.raw.to_string()).collect();
        debug!(%key, candidates = reduced.len(), selector = self.selector.name(), "asking selector");
        let selection = self.selector.select(question, &reduced).await?;

        let picked = match allowed.get(selection.index) {
            Some(c) => *c,
            None => {
                let wanted = normalize(&selection.text);
                allowed
                    .iter()
                    .find(|c| same_text(&c.text, &wanted))
                    .copied()
                    .ok_or_else(|| {
                        QuizError::ResponseFormat(format!(
                            "selection {} ({:?}) is not one of {} candidates",
                            selection.index,
                            selection.text,
                            allowed.len()
                        ))
                    })?
            }
        };

        let original = candidates.get(picked.index).ok_or_else(|| {
            QuizError::MatchExhaustion(format!("candidate position {} out of range", picked.index))
        })?;
        info!(%key, index = original.index, "answered by inference");
        Ok(resolution(original, ResolutionSource::Inference))
    }
}

fn resolution(c: &Candidate<'_>, source: ResolutionSource) -> Resolution {
    Resolution {
        chosen_index: c.index,
        chosen_text: c.raw.to_string(),
        used_inference: source == ResolutionSource::Inference,
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::memory::MemoryMap;
    use crate::store::InMemoryStore;
    use crate::traits::Selection;

    /// Selector that replays a fixed answer and records what it was offered.
    struct ScriptedSelector {
        answer: std::result::Result<Selection, String>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedSelector {
        fn picking(index: usize, text: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(Selection {
                    index,
                    text: text.to_string(),
                }),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(msg: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Err(msg.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AnswerSelector for ScriptedSelector {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn select(&self, _question: &str, candidates: &[String]) -> Result<Selection> {
            self.calls.lock().unwrap().push(candidates.to_vec());
            self.answer
                .clone()
                .map_err(QuizError::ServiceRejection)
        }
    }

    fn opts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn engine(selector: Arc<ScriptedSelector>) -> DecisionEngine {
        let store: Arc<InMemoryStore<MemoryMap>> = Arc::new(InMemoryStore::new());
        DecisionEngine::new(MemoryRepository::new(store), selector)
    }

    #[tokio::test]
    async fn memory_hit_needs_no_inference() {
        let selector = ScriptedSelector::picking(0, "3");
        let engine = engine(selector.clone());
        let key = QuestionKey::from_question("2+2=?");
        engine.memory().set_correct(&key, "4").unwrap();

        let r = engine.resolve("2+2=?", &opts(&["3", "4", "5"])).await.unwrap();
        assert_eq!(r.chosen_index, 1);
        assert!(!r.used_inference);
        assert_eq!(r.source, ResolutionSource::Memory);
        assert!(selector.calls().is_empty());
    }

    #[tokio::test]
    async fn elimination_scopes_inference_candidates() {
        let selector = ScriptedSelector::picking(1, "C");
        let engine = engine(selector.clone());
        let key = QuestionKey::from_question("Pick one");
        engine.memory().add_wrong(&key, "A").unwrap();

        let r = engine.resolve("Pick one", &opts(&["A", "B", "C"])).await.unwrap();
        assert_eq!(selector.calls(), vec![opts(&["B", "C"])]);
        assert_eq!(r.chosen_index, 2);
        assert_eq!(r.chosen_text, "C");
        assert!(r.used_inference);
    }

    #[tokio::test]
    async fn single_remaining_candidate_needs_no_inference() {
        let selector = ScriptedSelector::picking(0, "A");
        let engine = engine(selector.clone());
        let key = QuestionKey::from_question("Q");
        engine.memory().add_wrong(&key, "A").unwrap();
        engine.memory().add_wrong(&key, "c.").unwrap();

        let r = engine.resolve("Q", &opts(&["A", "B", "C"])).await.unwrap();
        assert_eq!(r.chosen_index, 1);
        assert_eq!(r.source, ResolutionSource::Elimination);
        assert!(selector.calls().is_empty());
    }

    #[tokio::test]
    async fn all_wrong_falls_back_to_full_list() {
        let selector = ScriptedSelector::picking(0, "A");
        let engine = engine(selector.clone());
        let key = QuestionKey::from_question("Q");
        engine.memory().add_wrong(&key, "A").unwrap();
        engine.memory().add_wrong(&key, "B").unwrap();

        let r = engine.resolve("Q", &opts(&["A", "B"])).await.unwrap();
        assert_eq!(selector.calls(), vec![opts(&["A", "B"])]);
        assert_eq!(r.chosen_index, 0);
    }

    #[tokio::test]
    async fn out_of_range_index_uses_text_match() {
        let selector = ScriptedSelector::picking(7, "gamma!");
        let engine = engine(selector);
        let r = engine
            .resolve("Greek?", &opts(&["Alpha", "Beta", "Gamma"]))
            .await
            .unwrap();
        assert_eq!(r.chosen_index, 2);
    }

    #[tokio::test]
    async fn unresolvable_selection_is_response_format_error() {
        let selector = ScriptedSelector::picking(9, "delta");
        let engine = engine(selector);
        let err = engine
            .resolve("Greek?", &opts(&["Alpha", "Beta"]))
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::ResponseFormat(_)));
    }

    #[tokio::test]
    async fn learning_persists_when_selector_fails() {
        let selector = ScriptedSelector::failing("HTTP 403");
        let engine = engine(selector);
        let err = engine
            .resolve("Unknown question", &opts(&["x", "y"]))
            .await
            .unwrap_err();
        assert!(err.is_service_failure());

        let key = QuestionKey::from_question("Unknown question");
        let entry = engine.memory().get(&key).unwrap().unwrap();
        assert_eq!(entry.options.len(), 2);
        assert_eq!(entry.question_raw.as_deref(), Some("Unknown question"));
    }

    #[tokio::test]
    async fn legacy_entry_is_migrated_before_lookup() {
        let mut map = MemoryMap::new();
        let key = QuestionKey::from_question("Legacy?");
        map.insert(
            key.clone(),
            serde_json::from_str(r#"{"correctIndex": 2, "wrong": [0]}"#).unwrap(),
        );
        let selector = ScriptedSelector::picking(0, "X");
        let engine = DecisionEngine::new(
            MemoryRepository::new(Arc::new(InMemoryStore::with_value(map))),
            selector.clone(),
        );

        let r = engine.resolve("Legacy?", &opts(&["X", "Y", "Z"])).await.unwrap();
        assert_eq!(r.chosen_index, 2);
        assert_eq!(r.source, ResolutionSource::Memory);
        assert!(selector.calls().is_empty());
        assert!(!engine.memory().get(&key).unwrap().unwrap().is_legacy());
    }

    #[tokio::test]
    async fn empty_inputs_are_extraction_errors() {
        let engine = engine(ScriptedSelector::picking(0, "a"));
        assert!(matches!(
            engine.resolve("  ", &opts(&["a"])).await,
            Err(QuizError::Extraction(_))
        ));
        assert!(matches!(
            engine.resolve("Q", &[]).await,
            Err(QuizError::Extraction(_))
        ));
    }
}
