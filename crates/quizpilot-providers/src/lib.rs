//! quizpilot-providers — inference service integration.
//!
//! Implements the `AnswerSelector` trait on top of the Gemini
//! `generateContent` API, with credential rotation, plus configuration
//! loading and a network-free mock for tests.

pub mod config;
pub mod error;
pub mod gemini;
pub mod mock;
pub mod prompt;

pub use config::{create_selector, load_config, load_config_from, QuizpilotConfig};
pub use error::ProviderError;
pub use gemini::{GeminiSelector, GeminiSettings};
