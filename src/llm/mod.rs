//! Text-generation backends behind one completion trait.

use crate::error::{DevlicaError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod anthropic;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Per-call generation knobs; unset fields use the backend's defaults
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompleteOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// A backend that turns a system prompt and a user prompt into text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Runs one completion and returns the generated text
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        options: Option<CompleteOptions>,
    ) -> Result<String>;
}

/// Supported backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(name = "openai")]
    OpenAi,
    #[default]
    Anthropic,
    Ollama,
}

impl ProviderKind {
    /// Model used when none is configured
    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o",
            Self::Anthropic => "claude-sonnet-4-5",
            Self::Ollama => "llama3",
        }
    }

    /// Whether the backend needs an API key
    pub fn requires_api_key(self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        })
    }
}

impl FromStr for ProviderKind {
    type Err = DevlicaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(DevlicaError::Config(format!("unknown LLM provider: {other}"))),
        }
    }
}

/// Everything needed to build a backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    /// Empty means [`ProviderKind::default_model`]
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub ollama_host: String,
}

impl ProviderSettings {
    /// Configured model, or the backend default
    pub fn model(&self) -> &str {
        if self.model.is_empty() {
            self.kind.default_model()
        } else {
            &self.model
        }
    }
}

/// Builds the backend selected by `settings`
pub fn create_provider(settings: &ProviderSettings) -> Result<Box<dyn CompletionProvider>> {
    let model = settings.model().to_string();
    match settings.kind {
        ProviderKind::OpenAi => Ok(Box::new(OpenAiProvider::new(&settings.api_key, model))),
        ProviderKind::Anthropic => Ok(Box::new(AnthropicProvider::new(&settings.api_key, model)?)),
        ProviderKind::Ollama => {
            let host = if settings.ollama_host.is_empty() {
                DEFAULT_OLLAMA_HOST
            } else {
                settings.ollama_host.as_str()
            };
            Ok(Box::new(OllamaProvider::new(host, model)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("openai", ProviderKind::OpenAi)]
    #[test_case("Anthropic", ProviderKind::Anthropic)]
    #[test_case(" ollama ", ProviderKind::Ollama)]
    fn test_provider_kind_from_str(raw: &str, want: ProviderKind) {
        assert_eq!(raw.parse::<ProviderKind>().unwrap(), want);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!("invalid".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_default_models() {
        let settings = ProviderSettings {
            kind: ProviderKind::Anthropic,
            ..Default::default()
        };
        assert_eq!(settings.model(), "claude-sonnet-4-5");
        assert_eq!(ProviderKind::OpenAi.default_model(), "gpt-4o");
        assert_eq!(ProviderKind::Ollama.default_model(), "llama3");
    }

    #[test_case(ProviderKind::OpenAi)]
    #[test_case(ProviderKind::Anthropic)]
    #[test_case(ProviderKind::Ollama)]
    fn test_create_provider(kind: ProviderKind) {
        let settings = ProviderSettings {
            kind,
            model: "model".into(),
            api_key: "fake-key".into(),
            ollama_host: DEFAULT_OLLAMA_HOST.into(),
        };
        assert!(create_provider(&settings).is_ok());
    }

    #[test]
    fn test_provider_kind_serde() {
        let kind: ProviderKind = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(kind, ProviderKind::OpenAi);
        assert_eq!(ProviderKind::Anthropic.to_string(), "anthropic");
    }
}
