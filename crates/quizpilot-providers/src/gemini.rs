//! Gemini `generateContent` answer selector.
//!
//! One call per question. Failed attempts follow the rotation protocol:
//! a first 429 is retried once on the same credential after a short delay;
//! a repeated 429, an auth failure, a network failure or a blocked reply
//! offers a switch to the next credential in the ring. The same request is
//! then retransmitted under the new credential.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use quizpilot_core::credentials::{ActiveCredential, CredentialRing};
use quizpilot_core::store::SnapshotStore;
use quizpilot_core::traits::{AnswerSelector, DecisionPort, RotationDecision, Selection};
use quizpilot_core::QuizError;

use crate::error::ProviderError;
use crate::prompt::{build_prompt, parse_reply, resolve_answer};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_millis(800);

/// Settings for [`GeminiSelector`].
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Wait before retrying a first 429 on the same credential.
    pub rate_limit_delay: Duration,
    /// Rotate without asking the decision port.
    pub auto_rotate: bool,
    /// Optional topic hint for the prompt.
    pub subject: Option<String>,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            rate_limit_delay: DEFAULT_RATE_LIMIT_DELAY,
            auto_rotate: false,
            subject: None,
        }
    }
}

/// Answer selector backed by the Gemini API.
pub struct GeminiSelector {
    settings: GeminiSettings,
    ring: Arc<dyn SnapshotStore<CredentialRing>>,
    decider: Arc<dyn DecisionPort>,
    client: reqwest::Client,
}

impl GeminiSelector {
    pub fn new(
        settings: GeminiSettings,
        ring: Arc<dyn SnapshotStore<CredentialRing>>,
        decider: Arc<dyn DecisionPort>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            settings,
            ring,
            decider,
            client,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct ResponseCandidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

fn error_message(body: String) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

impl GeminiSelector {
    /// Send the request once under `key` and return the reply text.
    async fn send_once(
        &self,
        key: &str,
        body: &GenerateContentRequest,
    ) -> Result<String, ProviderError> {
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        );
        let url = reqwest::Url::parse_with_params(&endpoint, &[("key", key)])
            .map_err(|e| ProviderError::InvalidEndpoint(format!("{endpoint}: {e}")))?;

        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.settings.timeout_secs)
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        match status {
            429 => return Err(ProviderError::RateLimited),
            401 => {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::AuthenticationFailed(error_message(body)));
            }
            403 => {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::Forbidden(error_message(body)));
            }
            s if s >= 400 => {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::ApiError {
                    status,
                    message: error_message(body),
                });
            }
            _ => {}
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Blocked(format!("unreadable response body: {e}")))?;

        let Some(first) = parsed.candidates.first() else {
            let reason = parsed
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(ProviderError::Blocked(reason));
        };

        Ok(first
            .content
            .as_ref()
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect::<String>())
            .unwrap_or_default())
    }

    /// Offer a switch to the next credential. Returns the new credential on
    /// acceptance, `None` on decline or when there is nothing to switch to.
    fn offer_rotation(&self, reason: &ProviderError) -> Result<Option<ActiveCredential>, QuizError> {
        let mut ring = self.ring.load()?;
        if ring.len() <= 1 {
            return Ok(None);
        }
        let next = ring.next_index();
        let accepted = self.settings.auto_rotate
            || self.decider.decide(&reason.to_string(), next + 1, ring.len())
                == RotationDecision::Accept;
        if !accepted {
            info!(reason = %reason, "credential rotation declined");
            return Ok(None);
        }

        let active = ring.advance();
        self.ring.save(&ring)?;
        if let Some(a) = &active {
            info!(credential = %a.ordinal(), reason = %reason, "rotated to next credential");
        }
        Ok(active)
    }

    /// Send with retry and rotation; returns the reply text.
    async fn complete(&self, body: &GenerateContentRequest) -> Result<String, QuizError> {
        let mut credential = self.ring.load()?.current().ok_or(ProviderError::NoCredential)?;
        let mut rotations = 0usize;
        let mut retried_rate_limit = false;

        loop {
            let err = match self.send_once(&credential.key, body).await {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };
            warn!(credential = %credential.ordinal(), "inference attempt failed: {err}");

            if matches!(err, ProviderError::RateLimited) && !retried_rate_limit {
                retried_rate_limit = true;
                let delay_ms = self.settings.rate_limit_delay.as_millis() as u64;
                debug!(delay_ms, "retrying on same credential");
                tokio::time::sleep(self.settings.rate_limit_delay).await;
                continue;
            }
            if !err.offers_rotation() || rotations + 1 >= credential.total {
                return Err(err.into());
            }
            match self.offer_rotation(&err)? {
                Some(next) => {
                    credential = next;
                    rotations += 1;
                    retried_rate_limit = false;
                }
                None => return Err(err.into()),
            }
        }
    }
}

#[async_trait]
impl AnswerSelector for GeminiSelector {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip_all, fields(model = %self.settings.model, candidates = candidates.len()))]
    async fn select(&self, question: &str, candidates: &[String]) -> Result<Selection, QuizError> {
        if candidates.is_empty() {
            return Err(QuizError::MatchExhaustion("no candidates to offer".into()));
        }
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: build_prompt(question, candidates, self.settings.subject.as_deref()),
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        };

        let reply = self.complete(&body).await?;
        debug!(reply = %reply, "model reply");
        let answer = parse_reply(&reply)?;
        resolve_answer(&answer, candidates)
    }
}
