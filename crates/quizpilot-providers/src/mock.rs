//! Mock selector for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use quizpilot_core::traits::{AnswerSelector, Selection};
use quizpilot_core::QuizError;

use crate::prompt::{build_prompt, parse_reply, resolve_answer};

/// An answer selector that never touches the network.
///
/// Replies are raw model text, run through the same parsing as real replies,
/// chosen by question substring matching.
pub struct MockSelector {
    /// Map of question substring → reply text.
    replies: HashMap<String, String>,
    /// Reply if no question matches.
    default_reply: String,
    call_count: AtomicU32,
    last_prompt: Mutex<Option<String>>,
    last_candidates: Mutex<Vec<String>>,
}

impl MockSelector {
    pub fn new(replies: HashMap<String, String>) -> Self {
        Self {
            replies,
            default_reply: "{\"answerIndex\":0}".to_string(),
            call_count: AtomicU32::new(0),
            last_prompt: Mutex::new(None),
            last_candidates: Mutex::new(Vec::new()),
        }
    }

    /// A mock that always returns the same reply text.
    pub fn with_fixed_reply(reply: &str) -> Self {
        Self {
            default_reply: reply.to_string(),
            ..Self::new(HashMap::new())
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }

    /// Candidates passed on the most recent call.
    pub fn last_candidates(&self) -> Vec<String> {
        self.last_candidates.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerSelector for MockSelector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn select(&self, question: &str, candidates: &[String]) -> Result<Selection, QuizError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_prompt.lock().unwrap() = Some(build_prompt(question, candidates, None));
        *self.last_candidates.lock().unwrap() = candidates.to_vec();

        let reply = self
            .replies
            .iter()
            .find(|(needle, _)| question.contains(needle.as_str()))
            .map(|(_, v)| v.as_str())
            .unwrap_or(&self.default_reply);

        let answer = parse_reply(reply)?;
        resolve_answer(&answer, candidates)
    }
}
