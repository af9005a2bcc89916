//! Core trait definitions for answer selection and rotation decisions.
//!
//! `AnswerSelector` is implemented by the inference client in
//! `quizpilot-providers`; `DecisionPort` is implemented by whatever asks the
//! operator (or a policy) whether to switch credentials.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Answer selection
// ---------------------------------------------------------------------------

/// A candidate picked by an external selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Position within the candidate list that was offered.
    pub index: usize,
    /// Text of the chosen candidate.
    pub text: String,
}

/// Something that picks one candidate for a question, typically with one
/// external inference call.
#[async_trait]
pub trait AnswerSelector: Send + Sync {
    /// Human-readable backend name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Pick exactly one of `candidates` for `question`.
    ///
    /// Implementations must return an index inside `candidates` or fail with
    /// [`QuizError::ResponseFormat`](crate::QuizError::ResponseFormat).
    async fn select(&self, question: &str, candidates: &[String]) -> Result<Selection>;
}

// ---------------------------------------------------------------------------
// Rotation decisions
// ---------------------------------------------------------------------------

/// Answer to a rotation offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationDecision {
    Accept,
    Decline,
}

/// Asked whether to switch to the next credential after a failed attempt.
pub trait DecisionPort: Send + Sync {
    /// `next_ordinal` is the one-based position of the proposed credential
    /// and `total` the ring length.
    fn decide(&self, reason: &str, next_ordinal: usize, total: usize) -> RotationDecision;
}

/// Accepts every rotation offer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRotate;

impl DecisionPort for AlwaysRotate {
    fn decide(&self, _: &str, _: usize, _: usize) -> RotationDecision {
        RotationDecision::Accept
    }
}

/// Declines every rotation offer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRotate;

impl DecisionPort for NeverRotate {
    fn decide(&self, _: &str, _: usize, _: usize) -> RotationDecision {
        RotationDecision::Decline
    }
}
