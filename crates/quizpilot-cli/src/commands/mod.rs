//! Subcommand implementations and the pieces they share.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use quizpilot_core::engine::DecisionEngine;
use quizpilot_core::traits::{DecisionPort, RotationDecision};
use quizpilot_providers::config::{create_selector, load_config_from, QuizpilotConfig};

pub mod answer;
pub mod export;
pub mod harvest;
pub mod init;
pub mod keys;
pub mod run;
pub mod stats;

/// Global options passed to every command.
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub autopilot: bool,
}

impl Context {
    pub fn config(&self) -> Result<QuizpilotConfig> {
        let mut config = load_config_from(self.config_path.as_deref())?;
        if self.autopilot {
            config.auto_rotate = true;
        }
        debug!(?config, "configuration loaded");
        Ok(config)
    }
}

/// Asks on the terminal before switching to another API key.
struct StdinDecider;

impl DecisionPort for StdinDecider {
    fn decide(&self, reason: &str, next_ordinal: usize, total: usize) -> RotationDecision {
        let ask = || {
            eprint!("Request failed: {reason}\nSwitch to key #{next_ordinal}/{total}? [y/N] ");
            let _ = std::io::stderr().flush();
            let mut line = String::new();
            match std::io::stdin().lock().read_line(&mut line) {
                Ok(_) if matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes") => {
                    RotationDecision::Accept
                }
                _ => RotationDecision::Decline,
            }
        };
        // Reading stdin blocks; keep the runtime's other tasks moving.
        let decision = tokio::task::block_in_place(ask);
        info!(?decision, next_ordinal, total, "key switch answered on terminal");
        decision
    }
}

/// Decision engine over the configured memory file and Gemini selector.
pub fn build_engine(config: &QuizpilotConfig) -> Result<DecisionEngine> {
    let selector = create_selector(config, Arc::new(StdinDecider))?;
    Ok(DecisionEngine::new(config.memory_repository(), selector))
}
