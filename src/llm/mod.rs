//! src/llm/mod.rs

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::config::{Config, LlmProvider};

pub mod gemini;
pub mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAIClient;

/// One failed request to a provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
    /// Structured provider code, e.g. `RESOURCE_EXHAUSTED` or `insufficient_quota`.
    pub code: Option<String>,
    pub status: Option<u16>,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            status: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// The `LLMClient` trait defines the interface for a Large Language Model client.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Returns the name of the LLM client.
    fn name(&self) -> &str;
    /// Sends the prompt to `model`. `Ok(None)` means the response carried no text.
    async fn call(&self, model: &str, prompt: &str) -> Result<Option<String>, ProviderError>;
}

pub enum LLM {
    Gemini(GeminiClient),
    OpenAI(OpenAIClient),
}

impl LLM {
    pub fn as_client(&self) -> &dyn LLMClient {
        match self {
            LLM::Gemini(c) => c,
            LLM::OpenAI(c) => c,
        }
    }
}

/// Builds the client for the configured provider. Fails when the key is missing.
pub fn create_llm_client(config: &Config, http: Client) -> Result<LLM> {
    let api_key = config.api_key()?;
    let client = match config.llm_provider {
        LlmProvider::Gemini => LLM::Gemini(GeminiClient::new(
            http,
            api_key,
            config.gemini_api_base.clone(),
        )),
        LlmProvider::Chatgpt => LLM::OpenAI(OpenAIClient::new(
            http,
            api_key,
            config.openai_api_base.clone(),
        )),
    };
    Ok(client)
}

// --- Error classification ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    QuotaExhausted,
    Unauthorized,
    RateLimited,
    /// The model is unknown or unsupported: skip to another model.
    ModelUnavailable,
    Transient,
}

impl ErrorClass {
    pub fn should_retry(&self) -> bool {
        matches!(self, ErrorClass::Transient)
    }

    pub fn allows_fallback(&self) -> bool {
        matches!(self, ErrorClass::Transient | ErrorClass::ModelUnavailable)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorClass::QuotaExhausted => "quota exhausted",
            ErrorClass::Unauthorized => "invalid or unauthorized API key",
            ErrorClass::RateLimited => "rate limited",
            ErrorClass::ModelUnavailable => "model unavailable",
            ErrorClass::Transient => "transient failure",
        };
        f.write_str(label)
    }
}

/// Substrings (lowercase) that mark each fatal class for one provider.
pub struct ClassifierRules {
    pub quota: &'static [&'static str],
    pub unauthorized: &'static [&'static str],
    pub rate_limited: &'static [&'static str],
}

/// Case-insensitive substring match over the message and the structured code.
/// Fatal classes are checked before the "model" fallback.
pub fn classify_with(err: &ProviderError, rules: &ClassifierRules) -> ErrorClass {
    let haystack = format!(
        "{} {}",
        err.message,
        err.code.as_deref().unwrap_or_default()
    )
    .to_lowercase();
    let hit = |needles: &[&str]| needles.iter().any(|n| haystack.contains(n));

    if hit(rules.quota) {
        ErrorClass::QuotaExhausted
    } else if hit(rules.unauthorized) {
        ErrorClass::Unauthorized
    } else if hit(rules.rate_limited) {
        ErrorClass::RateLimited
    } else if haystack.contains("model") {
        ErrorClass::ModelUnavailable
    } else {
        ErrorClass::Transient
    }
}

// --- Retry ladder ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rung {
    pub model: String,
    /// 1-based attempt number for this model.
    pub attempt: u32,
}

impl Rung {
    pub fn new(model: &str, attempt: u32) -> Self {
        Self {
            model: model.to_string(),
            attempt,
        }
    }
}

/// A fixed sequence of rungs plus the provider's classifier and delay.
pub struct Ladder {
    pub provider: &'static str,
    pub rungs: Vec<Rung>,
    pub delay: Duration,
    pub classify: fn(&ProviderError) -> ErrorClass,
}

impl Ladder {
    pub fn for_provider(provider: LlmProvider) -> Self {
        match provider {
            LlmProvider::Gemini => gemini::ladder(),
            LlmProvider::Chatgpt => openai::ladder(),
        }
    }

    /// The ladder for the configured provider, honouring `llmRetryDelayMs`.
    pub fn from_config(config: &Config) -> Self {
        let ladder = Self::for_provider(config.llm_provider);
        match config.retry_delay_override() {
            Some(delay) => ladder.with_delay(delay),
            None => ladder,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Index of the first rung after `from` that uses a different model.
    fn next_distinct_model(&self, from: usize) -> usize {
        let model = &self.rungs[from].model;
        self.rungs
            .iter()
            .enumerate()
            .skip(from + 1)
            .find(|(_, rung)| &rung.model != model)
            .map(|(i, _)| i)
            .unwrap_or(self.rungs.len())
    }
}

#[derive(Debug, Error)]
pub enum LadderError {
    #[error("{provider} rejected the request on {model} ({class}); not retrying: {detail}")]
    Aborted {
        provider: &'static str,
        model: String,
        class: ErrorClass,
        detail: String,
    },

    #[error("{provider} failed after {attempts} attempts; last error: {last_error}")]
    Exhausted {
        provider: &'static str,
        attempts: usize,
        last_error: String,
    },
}

/// Walks the ladder until a rung returns non-empty text.
pub async fn run_ladder(
    client: &dyn LLMClient,
    ladder: &Ladder,
    prompt: &str,
) -> Result<String, LadderError> {
    let mut last_error = String::from("no attempts were made");
    let mut attempts = 0;
    let mut index = 0;

    while index < ladder.rungs.len() {
        let rung = &ladder.rungs[index];
        attempts += 1;
        log::info!(
            "calling {} model {} (attempt {}, rung {}/{})",
            client.name(),
            rung.model,
            rung.attempt,
            index + 1,
            ladder.rungs.len()
        );

        let next = match client.call(&rung.model, prompt).await {
            Ok(Some(text)) if !text.trim().is_empty() => return Ok(text.trim().to_string()),
            Ok(_) => {
                last_error = format!("{} returned an empty response", rung.model);
                log::warn!("{last_error}");
                index + 1
            }
            Err(err) => {
                let class = (ladder.classify)(&err);
                if !class.should_retry() && !class.allows_fallback() {
                    log::warn!("{} on {}: {class}, giving up", ladder.provider, rung.model);
                    return Err(LadderError::Aborted {
                        provider: ladder.provider,
                        model: rung.model.clone(),
                        class,
                        detail: err.to_string(),
                    });
                }
                log::warn!(
                    "{} attempt {} failed ({class}, http {}): {err}",
                    rung.model,
                    rung.attempt,
                    err.status.map_or_else(|| "-".to_string(), |s| s.to_string())
                );
                last_error = err.to_string();
                if class.should_retry() {
                    index + 1
                } else {
                    ladder.next_distinct_model(index)
                }
            }
        };

        if next < ladder.rungs.len() && !ladder.delay.is_zero() {
            tokio::time::sleep(ladder.delay).await;
        }
        index = next;
    }

    Err(LadderError::Exhausted {
        provider: ladder.provider,
        attempts,
        last_error,
    })
}
