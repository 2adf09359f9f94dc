//! LLM provider abstractions.
//!
//! This module defines the trait every language model backend implements,
//! plus the OpenAI and local (Ollama-compatible) implementations.
//!
//! ## Security
//!
//! Providers hold their API keys in [`ApiCredential`]; see [`secrets`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmSettings;

mod factory;
pub mod secrets;

#[cfg(feature = "local")]
mod local;
#[cfg(feature = "openai")]
mod openai;

pub use factory::build_provider;
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "local")]
pub use local::LocalProvider;
#[cfg(feature = "openai")]
pub use openai::OpenAiProvider;

/// Errors from LLM providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Configuration for a completion request.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature (0.0 for deterministic)
    pub temperature: f32,

    /// Request timeout
    pub timeout: Duration,

    /// Ask the backend to constrain output to a JSON object
    pub json_mode: bool,
}

impl CompletionConfig {
    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self {
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout: settings.timeout,
            json_mode: true,
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self::from_settings(&LlmSettings::default())
    }
}

/// Message role in a chat prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A chat message for LLM completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,

    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Response from an LLM completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content
    pub content: String,

    pub usage: TokenUsage,

    /// Model that served the request
    pub model: String,

    pub stop_reason: Option<String>,
}

/// Token usage from a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,

    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Provider abstraction allows swapping LLM backends.
///
/// The structured judge is the only caller; stages never talk to a provider
/// directly.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a chat completion.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Check if provider is reachable and configured.
    async fn health_check(&self) -> bool;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_creation() {
        assert_eq!(ChatMessage::system("s").role, Role::System);
        assert_eq!(ChatMessage::user("u").role, Role::User);
        assert_eq!(ChatMessage::assistant("a").role.as_str(), "assistant");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 50,
        };
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_completion_config_from_settings() {
        let settings = LlmSettings {
            model: "llama3.2".to_string(),
            timeout: Duration::from_secs(30),
            ..Default::default()
        };
        let config = CompletionConfig::from_settings(&settings);
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.json_mode);
    }
}
