use std::io;
use thiserror::Error;
use async_openai::error::OpenAIError;

/// Custom result type alias for the crate
pub type Result<T> = std::result::Result<T, DevlicaError>;

/// Errors that can occur while crawling activity or benchmarking a profile
#[derive(Debug, Error)]
pub enum DevlicaError {
    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing/serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// OpenAI API errors
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success response from the GitHub API
    #[error("GitHub API error: HTTP {status}: {message}")]
    GitHubApi {
        /// HTTP status code
        status: u16,
        /// Truncated response body
        message: String,
    },

    /// API rate limit retries exhausted
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Generative backend errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Malformed model output
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// The shared cancellation token fired
    #[error("operation cancelled")]
    Cancelled,

    /// An error tagged with the stage that produced it
    #[error("{context}: {source}")]
    Context {
        /// What was being attempted
        context: String,
        /// Underlying failure
        #[source]
        source: Box<DevlicaError>,
    },
}

impl DevlicaError {
    /// Wraps an error with a description of the failing stage
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Checks if this error is transient and retryable
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Http(_) | Self::RateLimitExceeded(_) | Self::Io(_) => true,
            Self::Context { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Checks if this error is fatal and should terminate processing
    pub fn is_fatal(&self) -> bool {
        !self.is_transient()
    }

    /// Checks whether the error is, or wraps, a cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Context { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}
