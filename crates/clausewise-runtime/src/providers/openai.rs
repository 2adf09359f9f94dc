//! OpenAI chat-completions provider.
//!
//! Requests JSON-object output when `json_mode` is set, so structured
//! judgments arrive without Markdown wrapping in the common case.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    secrets::{ApiCredential, CredentialSource},
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};

/// Environment variable name for the OpenAI API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI provider.
pub struct OpenAiProvider {
    credential: ApiCredential,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiProvider {
    /// Create a provider with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_credential(ApiCredential::new(
            api_key,
            CredentialSource::Programmatic,
            "OpenAI API key",
        ))
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::with_credential(ApiCredential::from_env(OPENAI_API_KEY_ENV, "OpenAI API key")?)
    }

    fn with_credential(credential: ApiCredential) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;
        Ok(Self {
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    /// Set custom base URL (Azure gateways, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    type_: &'static str,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<Choice>,
    model: String,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = OpenAiRequest {
            model: &config.model,
            messages: messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            response_format: config.json_mode.then_some(ResponseFormat {
                type_: "json_object",
            }),
        };

        // SECURITY: Only expose the credential here, at the point of use
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.credential.expose())
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(config.timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == 401 {
            return Err(ProviderError::AuthError);
        }

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let message = match response.json::<OpenAiError>().await {
                Ok(body) => body.error.message,
                Err(e) => format!("unreadable error body: {}", e),
            };
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ParseError("response has no choices".to_string()))?;

        let usage = body
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            model: body.model,
            stop_reason: choice.finish_reason,
        })
    }

    async fn health_check(&self) -> bool {
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = OpenAiProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let provider = OpenAiProvider::new("k")
            .unwrap()
            .with_base_url("https://gateway.example.com/v1/");
        assert_eq!(provider.base_url, "https://gateway.example.com/v1");
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let secret_key = "sk-proj-super-secret-12345";
        let provider = OpenAiProvider::new(secret_key).unwrap();
        let debug_output = format!("{:?}", provider);
        assert!(!debug_output.contains(secret_key));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_request_json_mode() {
        let messages = [ChatMessage::user("hi")];
        let request = OpenAiRequest {
            model: "gpt-4o",
            messages: messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: 10,
            temperature: 0.0,
            response_format: Some(ResponseFormat { type_: "json_object" }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{
            "model": "gpt-4o-2024-08-06",
            "choices": [{"message": {"role": "assistant", "content": "{\"ok\":true}"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;
        let parsed: OpenAiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("{\"ok\":true}"));
        assert_eq!(parsed.usage.unwrap().completion_tokens, 3);
    }

    #[tokio::test]
    async fn test_health_check_empty_key() {
        assert!(OpenAiProvider::new("k").unwrap().health_check().await);
        assert!(!OpenAiProvider::new("").unwrap().health_check().await);
    }
}
