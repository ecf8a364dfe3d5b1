use crate::error::{DevlicaError, Result};
use crate::llm::{CompleteOptions, CompletionProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Messages API backend
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DevlicaError::Network(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.into(),
            api_base: API_BASE.to_string(),
        })
    }

    /// Overrides the API root
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        options: Option<CompleteOptions>,
    ) -> Result<String> {
        let options = options.unwrap_or_default();
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
        };

        debug!(model = %self.model, "anthropic completion");
        let response = self
            .client
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DevlicaError::Llm(format!(
                "anthropic returned status {}: {}",
                status.as_u16(),
                crate::utils::text::truncate_field(&body, 4096)
            )));
        }

        let response: MessagesResponse = response.json().await?;
        response
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text)
            .ok_or_else(|| DevlicaError::Llm("anthropic returned no text content".into()))
    }
}
