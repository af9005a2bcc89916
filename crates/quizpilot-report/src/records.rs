//! Export records built from memory or from graded observations.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use quizpilot_core::harvest::{GradedObservation, SkipReason};
use quizpilot_core::memory::{MemoryEntry, MemoryMap};
use quizpilot_core::text::{normalize, same_text, TextVariant};

/// One question with its answers and the index of the correct one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub question: String,
    pub answers: Vec<String>,
    pub correct_index: usize,
    pub correct_text: String,
}

/// Build records for every remembered question with a known correct answer.
///
/// Map order is key order, so the output is deterministic.
pub fn from_memory(map: &MemoryMap) -> Vec<ExportRecord> {
    map.iter()
        .filter_map(|(key, entry)| {
            let correct = entry.known_correct()?;
            let question = entry
                .question_raw
                .clone()
                .filter(|q| !q.trim().is_empty())
                .unwrap_or_else(|| key.as_str().to_string());
            Some(record_for(question, entry, correct))
        })
        .collect()
}

fn record_for(question: String, entry: &MemoryEntry, correct: &TextVariant) -> ExportRecord {
    let mut answers: Vec<&TextVariant> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    if entry.options.is_empty() {
        seen.insert(&correct.normalized);
        answers.push(correct);
        for w in entry.wrong_texts() {
            if !w.normalized.is_empty() && seen.insert(&w.normalized) {
                answers.push(w);
            }
        }
    } else {
        for o in &entry.options {
            if !o.normalized.is_empty() && seen.insert(&o.normalized) {
                answers.push(o);
            }
        }
        if !answers.iter().any(|o| same_text(o, correct)) {
            answers.insert(0, correct);
        }
    }

    let mut answers: Vec<String> = answers.into_iter().map(|t| t.raw.clone()).collect();
    let correct_index = match answers.iter().position(|r| same_text(&normalize(r), correct)) {
        Some(i) => i,
        None => {
            // Only reachable when the correct raw text re-normalizes differently.
            answers.retain(|r| !same_text(&normalize(r), correct));
            answers.insert(0, correct.raw.clone());
            0
        }
    };

    ExportRecord {
        question,
        answers,
        correct_index,
        correct_text: correct.raw.clone(),
    }
}

/// Counts from a graded export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradedExportSummary {
    pub exported: usize,
    pub duplicates: usize,
    pub incorrect_filtered: usize,
    pub no_question_text: usize,
    pub no_answers: usize,
    pub no_chosen: usize,
}

/// Build records from the correctly answered observations of a graded batch.
///
/// The first observation of each question wins.
pub fn from_graded(batch: &[GradedObservation]) -> (Vec<ExportRecord>, GradedExportSummary) {
    let mut records = Vec::new();
    let mut summary = GradedExportSummary::default();
    let mut seen = HashSet::new();

    for observation in batch {
        let parsed = match observation.parse() {
            Ok(p) => p,
            Err(SkipReason::NoQuestionText) => {
                summary.no_question_text += 1;
                continue;
            }
            Err(SkipReason::NoAnswers) => {
                summary.no_answers += 1;
                continue;
            }
            Err(SkipReason::NoChosen) => {
                summary.no_chosen += 1;
                continue;
            }
        };
        if !parsed.correct {
            summary.incorrect_filtered += 1;
            continue;
        }
        if !seen.insert(parsed.key.clone()) {
            summary.duplicates += 1;
            continue;
        }
        records.push(ExportRecord {
            question: parsed.question,
            answers: parsed.answers,
            correct_index: parsed.chosen_index,
            correct_text: parsed.chosen_text,
        });
    }

    summary.exported = records.len();
    (records, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizpilot_core::memory::WrongMark;
    use quizpilot_core::text::QuestionKey;

    fn entry(correct: Option<&str>, options: &[&str], wrong: &[&str]) -> MemoryEntry {
        MemoryEntry {
            correct: correct.map(normalize),
            options: options.iter().map(|o| normalize(o)).collect(),
            wrong: wrong.iter().map(|w| WrongMark::Text(normalize(w))).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn entries_without_correct_are_skipped() {
        let mut map = MemoryMap::new();
        map.insert(QuestionKey::from_question("Q1"), entry(None, &["a", "b"], &["a"]));
        assert!(from_memory(&map).is_empty());
    }

    #[test]
    fn options_keep_their_order() {
        let mut map = MemoryMap::new();
        let mut e = entry(Some("B"), &["A", "B", "C"], &[]);
        e.question_raw = Some("Pick B".into());
        map.insert(QuestionKey::from_question("Pick B"), e);

        let records = from_memory(&map);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].question, "Pick B");
        assert_eq!(records[0].answers, vec!["A", "B", "C"]);
        assert_eq!(records[0].correct_index, 1);
        assert_eq!(records[0].correct_text, "B");
    }

    #[test]
    fn missing_correct_is_prepended() {
        let mut map = MemoryMap::new();
        map.insert(QuestionKey::from_question("q"), entry(Some("D"), &["A", "B"], &[]));

        let r = &from_memory(&map)[0];
        assert_eq!(r.question, "q");
        assert_eq!(r.answers, vec!["D", "A", "B"]);
        assert_eq!(r.correct_index, 0);
    }

    #[test]
    fn without_options_correct_comes_first_then_wrong() {
        let mut map = MemoryMap::new();
        map.insert(
            QuestionKey::from_question("q"),
            entry(Some("Yes"), &[], &["No", "Maybe"]),
        );

        let r = &from_memory(&map)[0];
        assert_eq!(r.answers, vec!["Yes", "No", "Maybe"]);
        assert_eq!(r.correct_index, 0);
    }

    #[test]
    fn graded_export_filters_and_counts() {
        let obs = |q: Option<&str>, answers: &[&str], correct: bool, chosen: Option<usize>| {
            GradedObservation {
                question: q.map(str::to_string),
                answers: answers.iter().map(|s| s.to_string()).collect(),
                correct,
                chosen_index: chosen,
            }
        };
        let batch = vec![
            obs(Some("Q1"), &["a", "b"], true, Some(1)),
            obs(Some("Q1 "), &["a", "b"], true, Some(1)),
            obs(Some("Q2"), &["a", "b"], false, Some(0)),
            obs(None, &["a"], true, Some(0)),
            obs(Some("Q3"), &[], true, Some(0)),
            obs(Some("Q4"), &["a"], true, None),
        ];

        let (records, summary) = from_graded(&batch);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].correct_index, 1);
        assert_eq!(records[0].correct_text, "b");
        assert_eq!(
            summary,
            GradedExportSummary {
                exported: 1,
                duplicates: 1,
                incorrect_filtered: 1,
                no_question_text: 1,
                no_answers: 1,
                no_chosen: 1,
            }
        );
    }

    #[test]
    fn json_fields_are_camel_case() {
        let r = ExportRecord {
            question: "q".into(),
            answers: vec!["a".into()],
            correct_index: 0,
            correct_text: "a".into(),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["correctIndex"], 0);
        assert_eq!(v["correctText"], "a");
    }
}
