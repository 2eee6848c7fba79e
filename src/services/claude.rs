use std::time::Duration;

use async_trait::async_trait;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
pub const MAX_TOKENS: u32 = 2000;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Model response had no text content")]
    EmptyResponse,

    #[error("No JSON object in model response")]
    MissingJson,

    #[error("Malformed report JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A single system + user prompt round trip to a language model.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError>;
}

pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl CompletionClient for ClaudeClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
        let response = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&serde_json::json!({
                "model": self.model,
                "max_tokens": MAX_TOKENS,
                "temperature": 0.7,
                "system": system,
                "messages": [{
                    "role": "user",
                    "content": prompt
                }]
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status, body });
        }

        let body: serde_json::Value = response.json().await?;
        body["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or(GenerationError::EmptyResponse)
    }
}
