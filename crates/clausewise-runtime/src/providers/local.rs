//! Local model provider speaking the Ollama chat API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};

/// Environment variable name for the local server URL.
pub const OLLAMA_BASE_URL_ENV: &str = "OLLAMA_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama-compatible local provider. No credential is needed.
#[derive(Debug)]
pub struct LocalProvider {
    base_url: String,
    client: reqwest::Client,
}

impl LocalProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    message: ResponseMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct LocalError {
    error: String,
}

#[async_trait]
impl LlmProvider for LocalProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = ChatRequest {
            model: &config.model,
            messages: &messages,
            stream: false,
            format: config.json_mode.then_some("json"),
            options: ChatOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
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
        if !status.is_success() {
            let message = match response.json::<LocalError>().await {
                Ok(body) => body.error,
                Err(e) => format!("unreadable error body: {}", e),
            };
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(CompletionResponse {
            content: body.message.content,
            usage: TokenUsage {
                prompt_tokens: body.prompt_eval_count,
                completion_tokens: body.eval_count,
            },
            model: body.model,
            stop_reason: body.done_reason,
        })
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(base_url = %self.base_url, error = %e, "Local model server unreachable");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "local"
    }
}
