//! Error taxonomy for a question cycle.
//!
//! Every failure the engine or the run loop can hit maps onto one of these
//! kinds, so callers branch on the variant instead of matching message text.

use thiserror::Error;

/// Convenience alias used across the core crate.
pub type Result<T> = std::result::Result<T, QuizError>;

/// Errors that can end a question cycle.
#[derive(Debug, Error)]
pub enum QuizError {
    /// The page collaborator could not supply the question or its options.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The inference service could not be reached and no rotation happened.
    #[error("transport error: {0}")]
    Transport(String),

    /// The inference service refused the request (quota, auth, blocked reply).
    #[error("service rejected request: {0}")]
    ServiceRejection(String),

    /// The reply could not be parsed or did not resolve to a candidate.
    #[error("invalid response: {0}")]
    ResponseFormat(String),

    /// A chosen candidate could not be mapped back to an option position.
    #[error("no option matches the chosen candidate: {0}")]
    MatchExhaustion(String),

    /// Reading or writing a persisted snapshot failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl QuizError {
    /// Returns `true` for failures that only reach the caller after every
    /// credential rotation was exhausted or declined.
    pub fn is_service_failure(&self) -> bool {
        matches!(self, QuizError::Transport(_) | QuizError::ServiceRejection(_))
    }

    /// Short machine-friendly label, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            QuizError::Extraction(_) => "extraction",
            QuizError::Transport(_) => "transport",
            QuizError::ServiceRejection(_) => "service_rejection",
            QuizError::ResponseFormat(_) => "response_format",
            QuizError::MatchExhaustion(_) => "match_exhaustion",
            QuizError::Storage(_) => "storage",
        }
    }
}

impl From<std::io::Error> for QuizError {
    fn from(e: std::io::Error) -> Self {
        QuizError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for QuizError {
    fn from(e: serde_json::Error) -> Self {
        QuizError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_failures_are_classified() {
        assert!(QuizError::Transport("down".into()).is_service_failure());
        assert!(QuizError::ServiceRejection("HTTP 429".into()).is_service_failure());
        assert!(!QuizError::ResponseFormat("bad json".into()).is_service_failure());
        assert!(!QuizError::Extraction("no question".into()).is_service_failure());
    }

    #[test]
    fn io_errors_become_storage() {
        let err: QuizError = std::io::Error::other("disk full").into();
        assert_eq!(err.kind(), "storage");
        assert!(err.to_string().contains("disk full"));
    }
}
