//! The `quizpilot run` command.
//!
//! Drives the run loop over a quiz file standing in for the quiz page.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serde::Deserialize;

use quizpilot_core::session::{Autopilot, AutopilotConfig, QuizPage};
use quizpilot_core::QuizError;

use super::{build_engine, Context};

/// One question of a quiz file.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
}

/// A quiz page backed by an in-memory question list.
struct QuizFilePage {
    questions: Vec<QuizQuestion>,
    cursor: Mutex<usize>,
    selected: Mutex<Vec<(usize, usize)>>,
}

impl QuizFilePage {
    fn new(questions: Vec<QuizQuestion>) -> Self {
        Self {
            questions,
            cursor: Mutex::new(0),
            selected: Mutex::new(Vec::new()),
        }
    }

    fn current(&self) -> Result<(usize, &QuizQuestion), QuizError> {
        let cursor = *self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        self.questions
            .get(cursor)
            .map(|q| (cursor, q))
            .ok_or_else(|| QuizError::Extraction(format!("no question at position {}", cursor + 1)))
    }
}

#[async_trait]
impl QuizPage for QuizFilePage {
    async fn question_text(&self) -> Result<String, QuizError> {
        Ok(self.current()?.1.question.clone())
    }

    async fn options(&self) -> Result<Vec<String>, QuizError> {
        Ok(self.current()?.1.options.clone())
    }

    async fn select(&self, index: usize) -> Result<(), QuizError> {
        let (position, q) = self.current()?;
        if index >= q.options.len() {
            return Err(QuizError::Extraction(format!(
                "question {} has no option {index}",
                position + 1
            )));
        }
        self.selected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((position, index));
        Ok(())
    }

    async fn advance(&self) -> Result<(), QuizError> {
        *self.cursor.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

fn load_quiz(path: &Path) -> Result<Vec<QuizQuestion>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz file: {}", path.display()))?;
    let questions: Vec<QuizQuestion> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse quiz file: {}", path.display()))?;
    anyhow::ensure!(!questions.is_empty(), "quiz file has no questions");
    Ok(questions)
}

pub async fn execute(
    ctx: &Context,
    quiz_path: PathBuf,
    count: Option<u32>,
    delay: Option<f64>,
) -> Result<()> {
    let config = ctx.config()?;
    let questions = load_quiz(&quiz_path)?;

    let count = count.unwrap_or(config.num_questions);
    anyhow::ensure!(count >= 1, "count must be at least 1");
    let delay = delay.unwrap_or(config.delay_secs);
    anyhow::ensure!(delay >= 0.0, "delay must not be negative");
    let count = count.min(questions.len() as u32);

    let engine = Arc::new(build_engine(&config)?);
    let page = Arc::new(QuizFilePage::new(questions));
    let autopilot = Autopilot::new(
        engine,
        page.clone(),
        config.run_state_store(),
        AutopilotConfig {
            resume_timeout: Duration::from_millis(config.resume_timeout_ms),
            poll_interval: Duration::from_millis(config.resume_poll_ms),
        },
    );

    autopilot.start(count, delay)?;
    eprintln!("Answering {count} question(s), {delay}s apart");
    let resolutions = autopilot.run_to_completion().await?;

    let selected = page.selected.lock().unwrap_or_else(|e| e.into_inner()).clone();
    for ((position, _), r) in selected.iter().zip(&resolutions) {
        println!(
            "Q{}: [{}] {} ({})",
            position + 1,
            r.chosen_index,
            r.chosen_text,
            r.source
        );
    }
    let inferred = resolutions.iter().filter(|r| r.used_inference).count();
    eprintln!(
        "\nComplete: {} answered, {} from memory or elimination, {} by inference",
        resolutions.len(),
        resolutions.len() - inferred,
        inferred
    );
    Ok(())
}
