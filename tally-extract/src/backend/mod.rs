//! Extraction backends: remote language-model APIs that turn a prompt into
//! free-form text.

pub mod anthropic;
pub mod openai;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use tally_core::{AnalysisError, ConfigError};

pub use anthropic::AnthropicBackend;
pub use openai::OpenAiBackend;

/// One remote completion call. Implementations never retry and never cache.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AnalysisError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAI => "openai",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-3-5-sonnet-latest",
            Provider::OpenAI => "gpt-4o-mini",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::OpenAI => "https://api.openai.com",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAI),
            other => Err(ConfigError::Invalid(format!("unknown provider: {other}"))),
        }
    }
}

pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Everything needed to reach a backend. Passed explicitly at construction;
/// there is no process-wide client.
#[derive(Clone)]
pub struct BackendConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
}

impl BackendConfig {
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
            base_url: provider.default_base_url().to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential {
                provider: self.provider.as_str(),
                env_var: self.provider.api_key_env(),
            });
        }
        if HeaderValue::from_str(&self.api_key).is_err()
            || HeaderValue::from_str(&format!("Bearer {}", self.api_key)).is_err()
        {
            return Err(ConfigError::Invalid(format!(
                "{} api key contains characters not allowed in an HTTP header",
                self.provider
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".to_string()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must be an http(s) URL: {}",
                self.base_url
            )));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be positive".to_string()));
        }
        Ok(())
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Validate `config` and build the matching backend.
pub fn build_backend(config: BackendConfig) -> Result<Arc<dyn ExtractionBackend>, ConfigError> {
    config.validate()?;
    Ok(match config.provider {
        Provider::Anthropic => Arc::new(AnthropicBackend::new(config)),
        Provider::OpenAI => Arc::new(OpenAiBackend::new(config)),
    })
}

/// Read the whole response body, mapping transport and status failures to
/// `BackendUnavailable`.
pub(crate) async fn read_success_body(
    label: &str,
    resp: reqwest::Response,
) -> Result<String, AnalysisError> {
    let status = resp.status();
    let txt = resp
        .text()
        .await
        .map_err(|e| AnalysisError::BackendUnavailable(format!("{label} response body: {e}")))?;
    if !status.is_success() {
        return Err(AnalysisError::BackendUnavailable(format!("{label} error: {status} {txt}")));
    }
    Ok(txt)
}
