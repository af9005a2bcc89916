//! Offline learning from graded question renderings.
//!
//! A review page shows every question with the option the respondent picked
//! and whether it was graded correct. Harvesting turns each of those into
//! memory without making any decisions.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::memory::MemoryRepository;
use crate::text::{collapse_whitespace, QuestionKey};

/// One graded question as extracted from a review rendering.
///
/// Fields are optional because extraction from a page can fail partway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradedObservation {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answers: Vec<String>,
    /// Whether the selected option was graded correct.
    pub correct: bool,
    /// Position of the option the respondent selected.
    #[serde(default)]
    pub chosen_index: Option<usize>,
}

/// Why an observation could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoQuestionText,
    NoAnswers,
    NoChosen,
}

/// An observation that passed extraction checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedObservation {
    pub key: QuestionKey,
    pub question: String,
    pub answers: Vec<String>,
    pub correct: bool,
    pub chosen_index: usize,
    pub chosen_text: String,
}

impl GradedObservation {
    /// Validate and normalize whitespace, or report why it is unusable.
    pub fn parse(&self) -> std::result::Result<ParsedObservation, SkipReason> {
        let question = collapse_whitespace(self.question.as_deref().unwrap_or_default());
        let key = QuestionKey::from_question(&question);
        if key.is_empty() {
            return Err(SkipReason::NoQuestionText);
        }
        if self.answers.is_empty() {
            return Err(SkipReason::NoAnswers);
        }
        let answers: Vec<String> = self.answers.iter().map(|a| collapse_whitespace(a)).collect();
        let chosen_index = self.chosen_index.ok_or(SkipReason::NoChosen)?;
        let chosen_text = answers
            .get(chosen_index)
            .filter(|t| !t.is_empty())
            .cloned()
            .ok_or(SkipReason::NoChosen)?;

        Ok(ParsedObservation {
            key,
            question,
            answers,
            correct: self.correct,
            chosen_index,
            chosen_text,
        })
    }
}

/// Tallies from one harvest batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestReport {
    pub learned_correct: usize,
    pub learned_wrong: usize,
    /// Every observation that taught nothing new, including the ones below.
    pub skipped: usize,
    pub duplicates: usize,
    pub no_question_text: usize,
    pub no_answers: usize,
    pub no_chosen: usize,
}

impl HarvestReport {
    fn record_skip(&mut self, reason: SkipReason) {
        self.skipped += 1;
        match reason {
            SkipReason::NoQuestionText => self.no_question_text += 1,
            SkipReason::NoAnswers => self.no_answers += 1,
            SkipReason::NoChosen => self.no_chosen += 1,
        }
    }
}

/// Writes graded observations into memory.
pub struct HarvestImporter {
    memory: MemoryRepository,
}

impl HarvestImporter {
    pub fn new(memory: MemoryRepository) -> Self {
        Self { memory }
    }

    /// Import one batch. The first observation of a question wins; repeats
    /// within the batch are counted as duplicates.
    ///
    /// Unusable observations never fail the batch; only storage errors do.
    pub fn import(&self, batch: &[GradedObservation]) -> Result<HarvestReport> {
        let mut report = HarvestReport::default();
        let mut seen = HashSet::new();

        for (position, observation) in batch.iter().enumerate() {
            let parsed = match observation.parse() {
                Ok(p) => p,
                Err(reason) => {
                    warn!(position, ?reason, "skipping graded observation");
                    report.record_skip(reason);
                    continue;
                }
            };
            if !seen.insert(parsed.key.clone()) {
                report.skipped += 1;
                report.duplicates += 1;
                continue;
            }

            self.memory.set_question_raw(&parsed.key, &parsed.question)?;
            self.memory.merge_options(&parsed.key, &parsed.answers)?;

            if parsed.correct {
                let had_correct = self
                    .memory
                    .get(&parsed.key)?
                    .is_some_and(|e| e.known_correct().is_some());
                self.memory.set_correct(&parsed.key, &parsed.chosen_text)?;
                if had_correct {
                    report.skipped += 1;
                } else {
                    report.learned_correct += 1;
                }
            } else if self.memory.add_wrong(&parsed.key, &parsed.chosen_text)? {
                report.learned_wrong += 1;
            } else {
                report.skipped += 1;
            }
        }

        debug!(?report, "harvest finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::InMemoryStore;
    use crate::text::{normalize, same_text};

    fn obs(q: &str, answers: &[&str], correct: bool, chosen: Option<usize>) -> GradedObservation {
        GradedObservation {
            question: Some(q.to_string()),
            answers: answers.iter().map(|s| s.to_string()).collect(),
            correct,
            chosen_index: chosen,
        }
    }

    fn importer() -> HarvestImporter {
        HarvestImporter::new(MemoryRepository::new(Arc::new(InMemoryStore::new())))
    }

    #[test]
    fn learns_correct_and_wrong() {
        let imp = importer();
        let report = imp
            .import(&[
                obs("Capital of France?", &["Paris", "Lyon"], true, Some(0)),
                obs("Largest planet?", &["Mars", "Jupiter"], false, Some(0)),
            ])
            .unwrap();
        assert_eq!(report.learned_correct, 1);
        assert_eq!(report.learned_wrong, 1);
        assert_eq!(report.skipped, 0);

        let fr = imp
            .memory
            .get(&QuestionKey::from_question("Capital of France?"))
            .unwrap()
            .unwrap();
        assert!(same_text(fr.correct.as_ref().unwrap(), &normalize("paris")));
        assert_eq!(fr.options.len(), 2);

        let planet = imp
            .memory
            .get(&QuestionKey::from_question("Largest planet?"))
            .unwrap()
            .unwrap();
        assert!(planet.is_known_wrong(&normalize("Mars")));
    }

    #[test]
    fn duplicates_within_batch_are_skipped() {
        let imp = importer();
        let report = imp
            .import(&[
                obs("Q1", &["a", "b"], false, Some(0)),
                obs("q1?", &["a", "b"], false, Some(1)),
            ])
            .unwrap();
        assert_eq!(report.learned_wrong, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.skipped, 1);
        let e = imp.memory.get(&QuestionKey::from_question("Q1")).unwrap().unwrap();
        assert_eq!(e.wrong.len(), 1);
    }

    #[test]
    fn extraction_failures_are_tallied_by_reason() {
        let imp = importer();
        let report = imp
            .import(&[
                GradedObservation {
                    question: None,
                    ..Default::default()
                },
                obs(" ?!... ", &["a"], true, Some(0)),
                obs("No answers", &[], true, Some(0)),
                obs("No chosen", &["a"], true, None),
                obs("Chosen out of range", &["a"], true, Some(3)),
            ])
            .unwrap();
        assert_eq!(report.no_question_text, 2);
        assert_eq!(report.no_answers, 1);
        assert_eq!(report.no_chosen, 2);
        assert_eq!(report.skipped, 5);
        assert_eq!(imp.memory.stats().unwrap().total, 0);
    }

    #[test]
    fn already_known_facts_count_as_skipped() {
        let imp = importer();
        imp.import(&[obs("Q", &["a", "b"], true, Some(1))]).unwrap();
        let again = imp.import(&[obs("Q", &["a", "b"], true, Some(1))]).unwrap();
        assert_eq!(again.learned_correct, 0);
        assert_eq!(again.skipped, 1);
    }

    #[test]
    fn observation_parses_from_json() {
        let json = r#"{"question":"  Q\n text ","answers":["x"],"correct":true,"chosen_index":0}"#;
        let o: GradedObservation = serde_json::from_str(json).unwrap();
        let p = o.parse().unwrap();
        assert_eq!(p.question, "Q text");
        assert_eq!(p.chosen_text, "x");
    }
}
