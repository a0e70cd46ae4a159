//! src/llm/openai.rs
use super::{classify_with, ClassifierRules, ErrorClass, LLMClient, Ladder, ProviderError, Rung};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const PRIMARY_MODEL: &str = "gpt-4o-mini";
const SECONDARY_MODEL: &str = "gpt-3.5-turbo";
const RETRY_DELAY: Duration = Duration::from_millis(500);

const RULES: ClassifierRules = ClassifierRules {
    quota: &["insufficient_quota", "quota", "billing"],
    unauthorized: &[
        "invalid_api_key",
        "incorrect api key",
        "invalid api key",
        "invalid_authentication",
        "unauthorized",
    ],
    rate_limited: &["rate limit", "rate_limit", "too many requests"],
};

pub fn ladder() -> Ladder {
    Ladder {
        provider: "ChatGPT",
        rungs: vec![
            Rung::new(PRIMARY_MODEL, 1),
            Rung::new(PRIMARY_MODEL, 2),
            Rung::new(SECONDARY_MODEL, 1),
            Rung::new(SECONDARY_MODEL, 2),
            Rung::new(PRIMARY_MODEL, 3),
        ],
        delay: RETRY_DELAY,
        classify,
    }
}

pub fn classify(err: &ProviderError) -> ErrorClass {
    classify_with(err, &RULES)
}

// --- 数据结构定义 (适配 OpenAI) ---
#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Choice {
    message: Option<MessageContent>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct MessageContent {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ErrorBody {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<Value>,
}

impl ErrorBody {
    /// `code` is usually a string but may be null or a number.
    fn code(&self) -> Option<String> {
        match &self.code {
            Some(Value::String(code)) => Some(code.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => self.kind.clone(),
        }
    }
}

// --- 客户端实现 ---
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl OpenAIClient {
    pub fn new(client: Client, api_key: String, api_base: Option<String>) -> Self {
        let api_base = api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Self {
            client,
            api_key,
            api_base,
        }
    }
}

#[async_trait::async_trait]
impl LLMClient for OpenAIClient {
    fn name(&self) -> &str {
        "ChatGPT"
    }

    async fn call(&self, model: &str, user_prompt: &str) -> Result<Option<String>, ProviderError> {
        let request_payload = OpenAIRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: user_prompt,
            }],
            temperature: 0.7,
        };

        let res = self
            .client
            .post(format!("{}/chat/completions", self.api_base.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&request_payload)
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("Failed to reach OpenAI: {}", e.without_url())))?;

        let res_status = res.status();
        if res_status.is_success() {
            let response = res.json::<OpenAIResponse>().await.unwrap_or_default();
            return Ok(response
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message)
                .and_then(|m| m.content));
        }

        let error_body = res.text().await.unwrap_or_default();
        let err = match serde_json::from_str::<ErrorEnvelope>(&error_body) {
            Ok(envelope) => {
                let code = envelope.error.code();
                let err = ProviderError::new(format!(
                    "OpenAI API error {}: {}",
                    res_status, envelope.error.message
                ));
                match code {
                    Some(code) => err.with_code(code),
                    None => err,
                }
            }
            Err(_) => ProviderError::new(format!(
                "Failed to call OpenAI API: {}\nResponse body: {}",
                res_status, error_body
            )),
        };
        Err(err.with_status(res_status.as_u16()))
    }
}
