//! Structured judge backed by an LLM provider.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use clausewise_core::{extract_json_block, SchemaKind};

use super::{JudgeError, PromptInputs, PromptTemplate, StructuredJudge};
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider};
use crate::usage::{LlmUsage, UsageTracker};

const PREVIEW_CHARS: usize = 200;

/// Structured judge over any [`LlmProvider`].
///
/// The target JSON Schema is sent as a leading system message; the response
/// is cut down to its JSON document (fences and prose dropped) and parsed.
/// Schema validation happens in [`super::structured_predict`].
pub struct LlmJudge {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
    usage: UsageTracker,
}

impl LlmJudge {
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompletionConfig) -> Self {
        Self {
            provider,
            config,
            usage: UsageTracker::new(),
        }
    }

    fn schema_instruction(schema: SchemaKind) -> Result<ChatMessage, JudgeError> {
        let document = schema.document()?;
        let pretty = serde_json::to_string_pretty(document)
            .map_err(|e| JudgeError::InvalidJson(e.to_string()))?;
        Ok(ChatMessage::system(format!(
            "Respond with a single JSON object describing a {} that conforms to this JSON Schema. \
             Do not include any text outside the JSON object.\n\n{}",
            schema.name(),
            pretty
        )))
    }
}

#[async_trait]
impl StructuredJudge for LlmJudge {
    async fn predict(
        &self,
        schema: SchemaKind,
        prompt: &PromptTemplate,
        inputs: &PromptInputs,
    ) -> Result<Value, JudgeError> {
        let mut messages = vec![Self::schema_instruction(schema)?];
        messages.extend(prompt.format(inputs)?);

        tracing::debug!(
            provider = self.provider.name(),
            template = prompt.name,
            schema = schema.name(),
            "Requesting structured prediction"
        );

        self.usage.record_call();
        let response = self.provider.complete(messages, &self.config).await?;
        self.usage.record_response(&response.usage);

        let block = extract_json_block(&response.content).ok_or_else(|| JudgeError::NoJson {
            preview: response.content.chars().take(PREVIEW_CHARS).collect(),
        })?;

        serde_json::from_str(block).map_err(|e| JudgeError::InvalidJson(e.to_string()))
    }

    fn usage(&self) -> LlmUsage {
        self.usage.snapshot()
    }
}
