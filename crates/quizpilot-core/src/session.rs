//! The run loop that answers a sequence of questions.
//!
//! The page hosting the quiz is an external collaborator behind
//! [`QuizPage`]. Between questions the page may navigate, so progress lives in
//! a persisted [`RunState`] and each cycle is started by [`Autopilot::resume`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::{DecisionEngine, Resolution};
use crate::error::{QuizError, Result};
use crate::store::SnapshotStore;

/// Host page contract. Implementations own all page structure.
#[async_trait]
pub trait QuizPage: Send + Sync {
    /// Text of the question currently shown.
    async fn question_text(&self) -> Result<String>;

    /// Option texts in presentation order.
    async fn options(&self) -> Result<Vec<String>>;

    /// Mark the option at `index` as selected.
    async fn select(&self, index: usize) -> Result<()>;

    /// Move on to the next question.
    async fn advance(&self) -> Result<()>;
}

/// Progress of a run, persisted across page navigation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub remaining: u32,
    #[serde(default)]
    pub delay_seconds: f64,
    /// Hash of the last question answered, to skip it after a reload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_question_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl RunState {
    fn delay(&self) -> Duration {
        if self.delay_seconds.is_finite() && self.delay_seconds > 0.0 {
            Duration::from_secs_f64(self.delay_seconds)
        } else {
            Duration::ZERO
        }
    }
}

/// 32-bit FNV-1a over UTF-16 code units, as a decimal string.
pub fn question_hash(text: &str) -> String {
    let mut h: u32 = 2_166_136_261;
    for unit in text.encode_utf16() {
        h ^= u32::from(unit);
        h = h.wrapping_mul(16_777_619);
    }
    h.to_string()
}

/// What one call to [`Autopilot::resume`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No run in progress.
    Idle,
    /// No question appeared within the polling window; the run was stopped.
    TimedOut,
    /// The question on the page was already answered in this run.
    AlreadyAnswered,
    /// A question was answered and the page advanced.
    Answered {
        resolution: Resolution,
        remaining: u32,
    },
    /// The last question of the run was answered.
    Done { resolution: Resolution },
}

/// Timing knobs for the run loop.
#[derive(Debug, Clone)]
pub struct AutopilotConfig {
    /// How long to wait for a question to become available on resume.
    pub resume_timeout: Duration,
    /// Interval between availability checks.
    pub poll_interval: Duration,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            resume_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(120),
        }
    }
}

pub struct Autopilot {
    engine: Arc<DecisionEngine>,
    page: Arc<dyn QuizPage>,
    state: Arc<dyn SnapshotStore<RunState>>,
    config: AutopilotConfig,
}

impl Autopilot {
    pub fn new(
        engine: Arc<DecisionEngine>,
        page: Arc<dyn QuizPage>,
        state: Arc<dyn SnapshotStore<RunState>>,
        config: AutopilotConfig,
    ) -> Self {
        Self {
            engine,
            page,
            state,
            config,
        }
    }

    /// Begin a run of `count` questions with `delay_seconds` between them.
    pub fn start(&self, count: u32, delay_seconds: f64) -> Result<RunState> {
        let state = RunState {
            running: true,
            remaining: count.max(1),
            delay_seconds: delay_seconds.max(0.0),
            last_question_hash: None,
            run_id: Some(Uuid::new_v4()),
            started_at: Some(Utc::now()),
        };
        self.state.save(&state)?;
        info!(run_id = ?state.run_id, count = state.remaining, "run started");
        Ok(state)
    }

    /// Stop the run. A cycle already waiting on the network is not aborted,
    /// but nothing continues after it.
    pub fn stop(&self) -> Result<()> {
        self.state.clear()?;
        info!("run stopped");
        Ok(())
    }

    pub fn status(&self) -> Result<RunState> {
        self.state.load()
    }

    async fn wait_for_question(&self) -> Option<(String, Vec<String>)> {
        let deadline = tokio::time::Instant::now() + self.config.resume_timeout;
        loop {
            if let (Ok(q), Ok(opts)) = (self.page.question_text().await, self.page.options().await) {
                if !q.trim().is_empty() && !opts.is_empty() {
                    return Some((q, opts));
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Run one question cycle if a run is in progress.
    ///
    /// Any error stops the run. Memory learned before the error is kept.
    pub async fn resume(&self) -> Result<CycleOutcome> {
        let state = self.state.load()?;
        if !state.running {
            return Ok(CycleOutcome::Idle);
        }

        let Some((question, options)) = self.wait_for_question().await else {
            warn!("no question became available, going idle");
            self.state.clear()?;
            return Ok(CycleOutcome::TimedOut);
        };

        let hash = question_hash(&question);
        if state.last_question_hash.as_deref() == Some(hash.as_str()) {
            debug!(%hash, "question already answered in this run");
            return Ok(CycleOutcome::AlreadyAnswered);
        }

        match self.answer(&question, &options, state, hash).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(kind = e.kind(), "run aborted: {e}");
                self.state.clear()?;
                Err(e)
            }
        }
    }

    async fn answer(
        &self,
        question: &str,
        options: &[String],
        state: RunState,
        hash: String,
    ) -> Result<CycleOutcome> {
        let resolution = self.engine.resolve(question, options).await?;
        self.page.select(resolution.chosen_index).await.map_err(|e| match e {
            QuizError::Extraction(msg) => QuizError::MatchExhaustion(format!(
                "option {} could not be selected: {msg}",
                resolution.chosen_index
            )),
            other => other,
        })?;

        let remaining = state.remaining.saturating_sub(1);
        if remaining == 0 {
            self.state.clear()?;
            info!(run_id = ?state.run_id, "run complete");
            return Ok(CycleOutcome::Done { resolution });
        }

        let delay = state.delay();
        self.state.save(&RunState {
            remaining,
            last_question_hash: Some(hash),
            ..state
        })?;
        tokio::time::sleep(delay).await;

        if !self.state.load()?.running {
            debug!("run stopped during delay, not advancing");
            return Ok(CycleOutcome::Answered {
                resolution,
                remaining,
            });
        }
        self.page.advance().await?;
        Ok(CycleOutcome::Answered {
            resolution,
            remaining,
        })
    }

    /// Keep resuming until the run finishes, goes idle, or fails.
    pub async fn run_to_completion(&self) -> Result<Vec<Resolution>> {
        let mut answered = Vec::new();
        loop {
            match self.resume().await? {
                CycleOutcome::Answered { resolution, .. } => answered.push(resolution),
                CycleOutcome::Done { resolution } => {
                    answered.push(resolution);
                    break;
                }
                CycleOutcome::Idle | CycleOutcome::TimedOut | CycleOutcome::AlreadyAnswered => break,
            }
            if !self.state.load()?.running {
                break;
            }
        }
        Ok(answered)
    }
}
