use crate::error::{DevlicaError, Result};
use crate::llm::{CompleteOptions, CompletionProvider};
use crate::utils::text::truncate_field;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Local models can take minutes on a cold start
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Debug, Serialize, PartialEq)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

impl GenerateOptions {
    fn from_complete(options: Option<CompleteOptions>) -> Option<Self> {
        let options = options?;
        if options.temperature.is_none() && options.max_tokens.is_none() {
            return None;
        }
        Some(Self {
            temperature: options.temperature,
            num_predict: options.max_tokens,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Local Ollama backend using the non-streaming generate endpoint
pub struct OllamaProvider {
    client: Client,
    host: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(host: &str, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DevlicaError::Network(e.to_string()))?;
        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        options: Option<CompleteOptions>,
    ) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            system: (!system.is_empty()).then_some(system),
            prompt,
            stream: false,
            options: GenerateOptions::from_complete(options),
        };

        debug!(model = %self.model, host = %self.host, "ollama completion");
        let response = self
            .client
            .post(format!("{}/api/generate", self.host))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DevlicaError::Llm(format!(
                "ollama returned status {}: {}",
                status.as_u16(),
                truncate_field(&body, 4096)
            )));
        }

        let response: GenerateResponse = response.json().await?;
        Ok(response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_options_sent_only_when_set() {
        assert_eq!(GenerateOptions::from_complete(None), None);
        assert_eq!(GenerateOptions::from_complete(Some(CompleteOptions::default())), None);
        assert_eq!(
            GenerateOptions::from_complete(Some(CompleteOptions {
                temperature: None,
                max_tokens: Some(128),
            })),
            Some(GenerateOptions {
                temperature: None,
                num_predict: Some(128),
            })
        );
    }

    #[tokio::test]
    async fn test_generate_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_json(serde_json::json!({
                "model": "llama3",
                "system": "sys",
                "prompt": "hi",
                "stream": false
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": "hello", "done": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&server.uri(), "llama3").unwrap();
        assert_eq!(provider.complete("sys", "hi", None).await.unwrap(), "hello");
    }
}
