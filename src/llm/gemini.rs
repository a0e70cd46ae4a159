//! src/llm/gemini.rs
use super::{classify_with, ClassifierRules, ErrorClass, LLMClient, Ladder, ProviderError, Rung};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const PRIMARY_MODEL: &str = "gemini-2.0-flash";
const SECONDARY_MODEL: &str = "gemini-1.5-flash";
const RETRY_DELAY: Duration = Duration::from_millis(1000);

const RULES: ClassifierRules = ClassifierRules {
    quota: &["quota", "billing", "resource_exhausted"],
    unauthorized: &[
        "api key not valid",
        "api_key_invalid",
        "invalid api key",
        "unauthenticated",
        "permission_denied",
        "unauthorized",
    ],
    rate_limited: &["rate limit", "rate_limit", "too many requests"],
};

pub fn ladder() -> Ladder {
    Ladder {
        provider: "Gemini",
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

// --- 数据结构定义 ---
#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<Content<'a>>,
}
#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}
#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct GeminiResponse {
    candidates: Vec<Candidates>,
}
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct Candidates {
    content: Option<ContentResponse>,
}
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct ContentResponse {
    parts: Vec<PartResponse>,
}
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct ErrorBody {
    message: String,
    status: Option<String>,
}

impl GeminiResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
    }
}

// --- 客户端实现 ---
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl GeminiClient {
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
impl LLMClient for GeminiClient {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn call(&self, model: &str, user_prompt: &str) -> Result<Option<String>, ProviderError> {
        let api_url = format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            model
        );
        let request_payload = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part { text: user_prompt }],
            }],
        };
        let res = self
            .client
            .post(&api_url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_payload)
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("Failed to reach Gemini: {}", e.without_url())))?;

        let res_status = res.status();
        if res_status.is_success() {
            // 响应结构缺失时视为空结果，而不是错误
            let response = res.json::<GeminiResponse>().await.unwrap_or_default();
            return Ok(response.into_text());
        }

        let error_body = res.text().await.unwrap_or_default();
        let mut err = match serde_json::from_str::<ErrorEnvelope>(&error_body) {
            Ok(envelope) => {
                let mut err = ProviderError::new(format!(
                    "Gemini API error {}: {}",
                    res_status, envelope.error.message
                ));
                if let Some(code) = envelope.error.status {
                    err = err.with_code(code);
                }
                err
            }
            Err(_) => ProviderError::new(format!(
                "Failed to call Gemini API: {}\nResponse body: {}",
                res_status, error_body
            )),
        };
        err = err.with_status(res_status.as_u16());
        Err(err)
    }
}
