//! Service configuration
//!
//! Configuration is read from an optional TOML file. Every section has
//! defaults, so an absent file yields a usable configuration as long as the
//! model identifier can be resolved from the environment.

use crate::screening::pipeline::ReportMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Top-level service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on accepted request bodies
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_body_bytes() -> u64 {
    64 * 1024
}

/// Supported inference backends
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    OpenAi,
    Anthropic,
}

impl LlmProviderKind {
    /// Parse a provider prefix such as the `anthropic` in `anthropic/claude-...`
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "anthropic" => Some(Self::Anthropic),
            _ => None,
        }
    }

    pub fn default_api_key_env(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

/// LLM section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Explicit provider; inferred from a `provider/model` identifier when unset
    pub provider: Option<LlmProviderKind>,
    /// Literal model identifier; takes precedence over `model_env`
    pub model: Option<String>,
    /// Environment variable holding the model identifier
    #[serde(default = "default_model_env")]
    pub model_env: String,
    /// Environment variable holding the API key (provider default when unset)
    pub api_key_env: Option<String>,
    /// Override for OpenAI-compatible gateways or test servers
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Provider HTTP client timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            model_env: default_model_env(),
            api_key_env: None,
            base_url: None,
            temperature: None,
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model_env() -> String {
    "MODEL_NAME".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

/// Pipeline section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineSection {
    #[serde(default)]
    pub report_mode: ReportMode,
}

/// Model identifier after provider inference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub provider: LlmProviderKind,
    pub model: String,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ServiceConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::InvalidConfig(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }

        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::InvalidConfig(format!(
                    "llm.temperature {temperature} must be between 0.0 and 2.0"
                )));
            }
        }

        if self.llm.model_env.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "llm.model_env must name an environment variable".to_string(),
            ));
        }

        Ok(())
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl LlmSection {
    /// Resolve the model identifier from the process environment
    pub fn resolve_model(&self) -> Result<ResolvedModel, ConfigError> {
        self.resolve_model_with(|name| std::env::var(name).ok())
    }

    /// Resolve the model identifier using the given variable lookup
    pub fn resolve_model_with<F>(&self, lookup: F) -> Result<ResolvedModel, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = self
            .model
            .clone()
            .or_else(|| lookup(&self.model_env))
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .ok_or_else(|| ConfigError::EnvVarNotFound(self.model_env.clone()))?;

        let (prefixed, model) = match raw.split_once('/') {
            Some((prefix, rest)) => match LlmProviderKind::from_prefix(prefix) {
                Some(kind) if !rest.is_empty() => (Some(kind), rest.to_string()),
                _ => (None, raw.clone()),
            },
            None => (None, raw.clone()),
        };

        let provider = match (self.provider, prefixed) {
            (Some(explicit), Some(inferred)) if explicit != inferred => {
                return Err(ConfigError::InvalidConfig(format!(
                    "llm.provider '{}' conflicts with model identifier '{raw}'",
                    explicit.as_str()
                )));
            }
            (Some(explicit), _) => explicit,
            (None, Some(inferred)) => inferred,
            (None, None) => LlmProviderKind::OpenAi,
        };

        Ok(ResolvedModel { provider, model })
    }

    /// Name of the environment variable holding the API key
    pub fn api_key_env_for(&self, provider: LlmProviderKind) -> String {
        self.api_key_env
            .clone()
            .unwrap_or_else(|| provider.default_api_key_env().to_string())
    }

    /// Get the provider API key from the process environment
    pub fn get_api_key(&self, provider: LlmProviderKind) -> Result<String, ConfigError> {
        let name = self.api_key_env_for(provider);
        std::env::var(&name)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::EnvVarNotFound(name))
    }
}
