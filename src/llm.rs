//! The `LanguageModel` port (§4.6): a remote text-completion service with a
//! fixed contract — a prompt in, generated text plus a token count out. The
//! token count feeds the orchestrator's token-budget cap (§5.9).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, OrchestratorError};

#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u32,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<Completion, OrchestratorError>;
}

// ── Wire types for the HTTP-backed implementation ──────────────────────────

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Deserialize)]
struct ApiChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    total_tokens: u32,
}

/// Talks to an OpenAI-chat-completions-shaped endpoint. Base URL, API key,
/// and model are read from environment variables at construction time
/// rather than at call time, so a misconfigured job fails fast during
/// orchestrator startup instead of mid-batch.
pub struct HttpLanguageModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl HttpLanguageModel {
    pub fn from_env() -> Result<Self, OrchestratorError> {
        let base_url = std::env::var("LLM_BASE_URL").map_err(|_| {
            OrchestratorError::Config(ConfigError::InvalidValue {
                key: "LLM_BASE_URL".into(),
                reason: "not set".into(),
            })
        })?;
        let api_key = std::env::var("LLM_API_KEY").map_err(|_| {
            OrchestratorError::Config(ConfigError::InvalidValue {
                key: "LLM_API_KEY".into(),
                reason: "not set".into(),
            })
        })?;
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| "default".to_string());
        let max_tokens = std::env::var("LLM_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(4096);

        let mut builder = reqwest::Client::builder();
        if let Ok(ms) = std::env::var("LLM_TIMEOUT_MS") {
            if let Ok(ms) = ms.parse::<u64>() {
                builder = builder.timeout(std::time::Duration::from_millis(ms));
            }
        }
        let client = builder
            .build()
            .map_err(|e| OrchestratorError::Model {
                retryable: false,
                reason: format!("build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model,
            max_tokens,
        })
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn complete(&self, system: &str, prompt: &str) -> Result<Completion, OrchestratorError> {
        let body = ApiRequest {
            model: self.model.clone(),
            messages: vec![
                ApiMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ApiMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| OrchestratorError::Model {
                retryable: true,
                reason: format!("request failed: {e}"),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let retryable = status.is_server_error() || status.as_u16() == 429;
            let text = resp.text().await.unwrap_or_default();
            return Err(OrchestratorError::Model {
                retryable,
                reason: format!("API error {status}: {text}"),
            });
        }

        let parsed: ApiResponse = resp.json().await.map_err(|e| OrchestratorError::Model {
            retryable: false,
            reason: format!("parse response: {e}"),
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OrchestratorError::Model {
                retryable: true,
                reason: "empty completion".into(),
            })?;

        let tokens_used = parsed
            .usage
            .map(|u| u.total_tokens)
            .unwrap_or_else(|| estimate_tokens(&text));

        Ok(Completion { text, tokens_used })
    }
}

/// Rough fallback when the endpoint omits usage accounting: ~4 characters
/// per token, the same heuristic most chat API docs quote.
fn estimate_tokens(text: &str) -> u32 {
    (text.len() as u32 / 4).max(1)
}

/// Deterministic stand-in for tests and the demo binary: echoes back a
/// templated answer derived from the prompt so assertions can check
/// structure without a live network dependency.
pub struct StubLanguageModel {
    pub canned_suffix: String,
}

impl StubLanguageModel {
    pub fn new(canned_suffix: impl Into<String>) -> Self {
        Self {
            canned_suffix: canned_suffix.into(),
        }
    }
}

impl Default for StubLanguageModel {
    fn default() -> Self {
        Self::new("[stub completion]")
    }
}

#[async_trait]
impl LanguageModel for StubLanguageModel {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<Completion, OrchestratorError> {
        let text = format!("{prompt}\n\n{}", self.canned_suffix);
        let tokens_used = estimate_tokens(&text);
        Ok(Completion { text, tokens_used })
    }
}
