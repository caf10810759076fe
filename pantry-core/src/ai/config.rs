//! AI configuration from environment variables.

use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default Anthropic API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Default model to use.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

pub const DEFAULT_MAX_TOKENS: u32 = 4096;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// AI client configuration.
#[derive(Clone)]
pub struct AiConfig {
    pub api_key: String,
    /// Model name (e.g., "claude-sonnet-4-20250514").
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `ANTHROPIC_API_KEY`: API key for the Messages API
    ///
    /// Optional:
    /// - `PANTRY_AI_MODEL`: Model name (default: "claude-sonnet-4-20250514")
    /// - `PANTRY_AI_BASE_URL`: API base URL (default: "https://api.anthropic.com")
    /// - `PANTRY_AI_MAX_TOKENS`: Response token cap (default: 4096)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`AiConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get("ANTHROPIC_API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("ANTHROPIC_API_KEY".to_string()))?;

        let mut config = Self::new(api_key.trim());

        if let Some(model) = get("PANTRY_AI_MODEL") {
            config.model = model;
        }
        if let Some(base_url) = get("PANTRY_AI_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(max_tokens) = get("PANTRY_AI_MAX_TOKENS") {
            config.max_tokens = max_tokens
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "PANTRY_AI_MAX_TOKENS".to_string(),
                    value: max_tokens.clone(),
                })?;
        }

        Ok(config)
    }
}
