use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::benchmark::BenchmarkSettings;
use crate::error::{DevlicaError, Result};
use crate::github::DEFAULT_API_BASE;
use crate::llm::{ProviderKind, ProviderSettings, DEFAULT_OLLAMA_HOST};

/// GitHub login rules: alphanumerics and inner hyphens, at most 39 characters
static USERNAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,37}[a-zA-Z0-9])?$").expect("username pattern compiles")
});

pub const DEFAULT_MAX_REPOS: usize = 10;
pub const DEFAULT_OUTPUT_DIR: &str = "./output";
const APP_DIR: &str = "devlica";
const CONFIG_FILE: &str = "config.toml";

/// Runtime configuration
///
/// Built in layers: defaults, then an optional TOML file, then environment
/// variables, then command-line flags applied by the binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub token; only ever read from the file or `GITHUB_TOKEN`
    #[serde(skip_serializing)]
    pub github_token: Option<String>,
    /// REST root, overridable for GitHub Enterprise and tests
    pub github_api_base: String,
    pub provider: ProviderSettings,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub anthropic_api_key: Option<String>,
    pub output_dir: PathBuf,
    /// Repositories to deep-crawl
    pub max_repos: usize,
    pub verbose: bool,
    pub log_level: String,
    pub benchmark: BenchmarkSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_token: None,
            github_api_base: DEFAULT_API_BASE.to_string(),
            provider: ProviderSettings {
                ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
                ..Default::default()
            },
            openai_api_key: None,
            anthropic_api_key: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            max_repos: DEFAULT_MAX_REPOS,
            verbose: false,
            log_level: "info".to_string(),
            benchmark: BenchmarkSettings::default(),
        }
    }
}

impl Config {
    /// Default location of the config file, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Loads defaults, the config file and the process environment
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parses a TOML config file over the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DevlicaError::Config(format!("failed to read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            DevlicaError::Config(format!("failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Overlays environment variables read through `lookup`
    ///
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("GITHUB_TOKEN") {
            self.github_token = Some(token);
        }
        if let Some(base) = get("GITHUB_API_BASE_URL") {
            self.github_api_base = base;
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(key) = get("ANTHROPIC_API_KEY") {
            self.anthropic_api_key = Some(key);
        }
        if let Some(host) = get("OLLAMA_HOST") {
            self.provider.ollama_host = host;
        }
    }

    /// Provider settings with the API key resolved for the selected backend
    pub fn provider_settings(&self) -> ProviderSettings {
        let mut settings = self.provider.clone();
        if settings.api_key.is_empty() {
            let key = match settings.kind {
                ProviderKind::OpenAi => self.openai_api_key.as_deref(),
                ProviderKind::Anthropic => self.anthropic_api_key.as_deref(),
                ProviderKind::Ollama => None,
            };
            settings.api_key = key.unwrap_or_default().to_string();
        }
        settings
    }

    /// Validates settings needed to crawl `username`
    pub fn validate_crawl(&self, username: &str) -> Result<()> {
        validate_username(username)?;
        self.github_token()?;
        if self.max_repos < 1 {
            return Err(DevlicaError::Validation("--max-repos must be at least 1".into()));
        }
        Ok(())
    }

    /// Validates settings needed to run the refinement loop
    pub fn validate_benchmark(&self) -> Result<()> {
        let settings = self.provider_settings();
        if settings.kind.requires_api_key() && settings.api_key.is_empty() {
            return Err(DevlicaError::Validation(format!(
                "{} requires an API key (set {})",
                settings.kind,
                env_key_for(settings.kind)
            )));
        }
        if self.benchmark.max_iterations < 1 {
            return Err(DevlicaError::Validation("max_iterations must be at least 1".into()));
        }
        let target = self.benchmark.target_score;
        if !(0.0..=100.0).contains(&target) {
            return Err(DevlicaError::Validation(format!(
                "target_score must be within 0..=100, got {target}"
            )));
        }
        Ok(())
    }

    /// Full validation for a crawl followed by a benchmark
    pub fn validate(&self, username: &str) -> Result<()> {
        self.validate_crawl(username)?;
        self.validate_benchmark()
    }

    pub fn github_token(&self) -> Result<&str> {
        self.github_token
            .as_deref()
            .ok_or_else(|| DevlicaError::Validation("GITHUB_TOKEN environment variable is required".into()))
    }
}

pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(DevlicaError::Validation("github username is required".into()));
    }
    if !USERNAME_PATTERN.is_match(username) {
        return Err(DevlicaError::Validation(format!("invalid github username {username:?}")));
    }
    Ok(())
}

fn env_key_for(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => "OPENAI_API_KEY",
        ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        ProviderKind::Ollama => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use test_case::test_case;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn ready() -> Config {
        let mut config = Config::default();
        config.apply_env(env(&[("GITHUB_TOKEN", "ghp_x"), ("ANTHROPIC_API_KEY", "sk-ant")]));
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_repos, 10);
        assert_eq!(config.provider.kind, ProviderKind::Anthropic);
        assert_eq!(config.benchmark.max_held_out, 3);
        assert_eq!(config.benchmark.max_iterations, 5);
        assert_eq!(config.benchmark.target_score, 80.0);
        assert_eq!(config.github_api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
max_repos = 4
output_dir = "/tmp/devlica"

[provider]
kind = "ollama"
model = "qwen2.5-coder"

[benchmark]
target_score = 70.0
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.max_repos, 4);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/devlica"));
        assert_eq!(config.provider.kind, ProviderKind::Ollama);
        assert_eq!(config.provider.model(), "qwen2.5-coder");
        assert_eq!(config.benchmark.target_score, 70.0);
        assert_eq!(config.benchmark.max_iterations, 5);
    }

    #[test]
    fn test_bad_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_repos = \"many\"").unwrap();
        assert!(matches!(Config::from_file(file.path()), Err(DevlicaError::Config(_))));
    }

    #[test]
    fn test_env_overlay() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("GITHUB_TOKEN", "ghp_x"),
            ("GITHUB_API_BASE_URL", "https://ghe.example.com/api/v3"),
            ("OLLAMA_HOST", "http://gpu:11434"),
            ("OPENAI_API_KEY", ""),
        ]));
        assert_eq!(config.github_token().unwrap(), "ghp_x");
        assert_eq!(config.github_api_base, "https://ghe.example.com/api/v3");
        assert_eq!(config.provider.ollama_host, "http://gpu:11434");
        assert_eq!(config.openai_api_key, None);
    }

    #[test]
    fn test_key_follows_selected_provider() {
        let mut config = ready();
        assert_eq!(config.provider_settings().api_key, "sk-ant");
        config.provider.kind = ProviderKind::OpenAi;
        assert_eq!(config.provider_settings().api_key, "");
        assert!(config.validate_benchmark().is_err());
        config.provider.kind = ProviderKind::Ollama;
        assert!(config.validate_benchmark().is_ok());
    }

    #[test_case("octocat", true ; "plain")]
    #[test_case("drpaneas", true ; "lowercase")]
    #[test_case("a-b-c", true ; "inner hyphens")]
    #[test_case("-leading", false ; "leading hyphen")]
    #[test_case("trailing-", false ; "trailing hyphen")]
    #[test_case("has space", false ; "space")]
    #[test_case("", false ; "empty")]
    fn test_username_validation(username: &str, valid: bool) {
        assert_eq!(validate_username(username).is_ok(), valid);
    }

    #[test]
    fn test_username_length_limit() {
        assert!(validate_username(&"a".repeat(39)).is_ok());
        assert!(validate_username(&"a".repeat(40)).is_err());
    }

    #[test]
    fn test_validate_requires_token() {
        let config = Config::default();
        assert!(config.validate_crawl("octocat").is_err());
        assert!(ready().validate("octocat").is_ok());
    }

    #[test_case(0, 80.0 ; "zero iterations")]
    #[test_case(5, 120.0 ; "target above range")]
    #[test_case(5, -1.0 ; "target below range")]
    fn test_benchmark_bounds(max_iterations: usize, target_score: f64) {
        let mut config = ready();
        config.benchmark.max_iterations = max_iterations;
        config.benchmark.target_score = target_score;
        assert!(config.validate_benchmark().is_err());
    }

    #[test]
    fn test_zero_repos_rejected() {
        let mut config = ready();
        config.max_repos = 0;
        assert!(config.validate_crawl("octocat").is_err());
    }
}
