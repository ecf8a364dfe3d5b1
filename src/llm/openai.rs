use crate::error::{DevlicaError, Result};
use crate::llm::{CompleteOptions, CompletionProvider};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::debug;

const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Chat-completions backend
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(OpenAIConfig::new().with_api_key(api_key)),
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        options: Option<CompleteOptions>,
    ) -> Result<String> {
        let options = options.unwrap_or_default();

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?
                    .into(),
            ])
            .temperature(options.temperature.unwrap_or(DEFAULT_TEMPERATURE));
        if let Some(max_tokens) = options.max_tokens {
            args.max_completion_tokens(max_tokens);
        }
        let request = args.build()?;

        debug!(model = %self.model, "openai completion");
        let response = self.client.chat().create(request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| DevlicaError::Llm("openai returned no choices".into()))
    }
}
