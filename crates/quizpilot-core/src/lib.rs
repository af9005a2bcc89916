//! quizpilot-core — answer memory and the decision engine.
//!
//! This crate owns the text normalization rules, the persistent per-question
//! memory, the credential ring, and the engine that decides which option to
//! pick before falling back to a single inference call.

pub mod credentials;
pub mod engine;
pub mod error;
pub mod harvest;
pub mod memory;
pub mod session;
pub mod store;
pub mod text;
pub mod traits;

pub use error::{QuizError, Result};
