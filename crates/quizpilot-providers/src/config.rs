//! Configuration, data-directory stores and selector factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizpilot_core::credentials::{mask_key, CredentialRing};
use quizpilot_core::memory::{MemoryMap, MemoryRepository};
use quizpilot_core::session::RunState;
use quizpilot_core::store::{CorruptPolicy, JsonFileStore, SnapshotStore};
use quizpilot_core::traits::{AnswerSelector, DecisionPort};

use crate::gemini::{GeminiSelector, GeminiSettings, DEFAULT_BASE_URL, DEFAULT_MODEL};

pub const MEMORY_FILE: &str = "memory.json";
pub const CREDENTIALS_FILE: &str = "credentials.json";
pub const RUN_STATE_FILE: &str = "run_state.json";

/// Top-level quizpilot configuration.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct QuizpilotConfig {
    /// Ordered API keys used to seed the credential ring.
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Optional topic hint added to the prompt.
    #[serde(default)]
    pub subject: Option<String>,
    /// Rotate credentials without asking.
    #[serde(default)]
    pub auto_rotate: bool,
    /// Wait before retrying a first 429, in milliseconds.
    #[serde(default = "default_rate_limit_delay")]
    pub rate_limit_delay_ms: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Directory holding memory, credential and run-state files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Default number of questions for a run.
    #[serde(default = "default_num_questions")]
    pub num_questions: u32,
    /// Default delay between questions, in seconds.
    #[serde(default = "default_delay")]
    pub delay_secs: f64,
    /// How long a resumed cycle waits for the question to render.
    #[serde(default = "default_resume_timeout")]
    pub resume_timeout_ms: u64,
    #[serde(default = "default_resume_poll")]
    pub resume_poll_ms: u64,
}

impl std::fmt::Debug for QuizpilotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let masked: Vec<String> = self.api_keys.iter().map(|k| mask_key(k)).collect();
        f.debug_struct("QuizpilotConfig")
            .field("api_keys", &masked)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("subject", &self.subject)
            .field("auto_rotate", &self.auto_rotate)
            .field("rate_limit_delay_ms", &self.rate_limit_delay_ms)
            .field("timeout_secs", &self.timeout_secs)
            .field("data_dir", &self.data_dir)
            .field("num_questions", &self.num_questions)
            .field("delay_secs", &self.delay_secs)
            .field("resume_timeout_ms", &self.resume_timeout_ms)
            .field("resume_poll_ms", &self.resume_poll_ms)
            .finish()
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_rate_limit_delay() -> u64 {
    800
}
fn default_timeout() -> u64 {
    60
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./quizpilot-data")
}
fn default_num_questions() -> u32 {
    1
}
fn default_delay() -> f64 {
    1.0
}
fn default_resume_timeout() -> u64 {
    15_000
}
fn default_resume_poll() -> u64 {
    120
}

impl Default for QuizpilotConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: default_model(),
            base_url: default_base_url(),
            subject: None,
            auto_rotate: false,
            rate_limit_delay_ms: default_rate_limit_delay(),
            timeout_secs: default_timeout(),
            data_dir: default_data_dir(),
            num_questions: default_num_questions(),
            delay_secs: default_delay(),
            resume_timeout_ms: default_resume_timeout(),
            resume_poll_ms: default_resume_poll(),
        }
    }
}

impl QuizpilotConfig {
    pub fn memory_path(&self) -> PathBuf {
        self.data_dir.join(MEMORY_FILE)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir.join(CREDENTIALS_FILE)
    }

    pub fn run_state_path(&self) -> PathBuf {
        self.data_dir.join(RUN_STATE_FILE)
    }

    /// Memory repository over `memory.json`. Damaged entries are repaired on
    /// load; an unparseable file is backed up and read as empty.
    pub fn memory_repository(&self) -> MemoryRepository {
        let store: JsonFileStore<MemoryMap> =
            JsonFileStore::new(self.memory_path()).with_corrupt_policy(CorruptPolicy::Reset);
        MemoryRepository::new(Arc::new(store))
    }

    /// Credential ring store over `credentials.json`, seeded from
    /// `api_keys` when the file does not exist yet.
    pub fn credential_store(&self) -> Result<Arc<dyn SnapshotStore<CredentialRing>>> {
        let store = JsonFileStore::<CredentialRing>::new(self.credentials_path());
        if !store.exists() && !self.api_keys.is_empty() {
            store
                .save(&CredentialRing::new(self.api_keys.iter()))
                .with_context(|| {
                    format!("failed to seed credentials: {}", self.credentials_path().display())
                })?;
        }
        Ok(Arc::new(store))
    }

    pub fn run_state_store(&self) -> Arc<dyn SnapshotStore<RunState>> {
        Arc::new(JsonFileStore::<RunState>::new(self.run_state_path()))
    }

    pub fn gemini_settings(&self) -> GeminiSettings {
        GeminiSettings {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            timeout_secs: self.timeout_secs,
            rate_limit_delay: Duration::from_millis(self.rate_limit_delay_ms),
            auto_rotate: self.auto_rotate,
            subject: self.subject.clone(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are not scanned again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + end];
        result.push_str(&rest[..start]);
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

/// Split a key list given as one string. Commas, semicolons and line breaks
/// all separate keys.
pub fn split_keys(raw: &str) -> Vec<String> {
    raw.split([',', ';', '\n', '\r'])
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizpilot.toml` in the current directory
/// 2. `~/.config/quizpilot/config.toml`
///
/// `QUIZPILOT_API_KEYS` overrides the configured key list.
pub fn load_config() -> Result<QuizpilotConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizpilotConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("quizpilot.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<QuizpilotConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizpilotConfig::default(),
    };

    if let Ok(keys) = std::env::var("QUIZPILOT_API_KEYS") {
        config.api_keys = split_keys(&keys);
    }

    config.api_keys = config
        .api_keys
        .iter()
        .map(|k| resolve_env_vars(k).trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    config.base_url = resolve_env_vars(&config.base_url);

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizpilot"))
}

/// Create the Gemini answer selector for this configuration.
pub fn create_selector(
    config: &QuizpilotConfig,
    decider: Arc<dyn DecisionPort>,
) -> Result<Arc<dyn AnswerSelector>> {
    let ring = config.credential_store()?;
    Ok(Arc::new(GeminiSelector::new(
        config.gemini_settings(),
        ring,
        decider,
    )))
}
