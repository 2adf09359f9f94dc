//! Structured judge: a language model constrained to answer with data that
//! conforms to a declared schema.
//!
//! The [`StructuredJudge`] trait returns raw JSON; [`structured_predict`]
//! validates it against the target type's embedded schema and deserializes
//! it. Keeping validation outside the trait means every judge, real or
//! scripted, is held to the same contract.

mod llm;
pub mod prompts;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use clausewise_core::{SchemaError, SchemaKind, StructuredOutput};

use crate::providers::ProviderError;
use crate::usage::LlmUsage;

pub use llm::LlmJudge;
pub use prompts::{PromptInputs, PromptTemplate};

/// Errors from a structured judge call.
#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("LLM call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Prompt '{template}' is missing input '{name}'")]
    MissingVariable {
        template: &'static str,
        name: String,
    },

    #[error("Model response contains no JSON: {preview}")]
    NoJson { preview: String },

    #[error("Model response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl JudgeError {
    /// True when the judge answered but the answer had the wrong shape.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(
            self,
            JudgeError::NoJson { .. }
                | JudgeError::InvalidJson(_)
                | JudgeError::Schema(SchemaError::Invalid { .. })
        )
    }
}

/// A language model capability that returns schema-shaped JSON.
#[async_trait]
pub trait StructuredJudge: Send + Sync {
    /// Ask for a value of shape `schema` using `prompt` filled with `inputs`.
    async fn predict(
        &self,
        schema: SchemaKind,
        prompt: &PromptTemplate,
        inputs: &PromptInputs,
    ) -> Result<Value, JudgeError>;

    /// Usage accumulated by this judge so far.
    fn usage(&self) -> LlmUsage {
        LlmUsage::default()
    }
}

/// Ask `judge` for a `T`, validating the answer against `T`'s schema.
pub async fn structured_predict<T: StructuredOutput>(
    judge: &dyn StructuredJudge,
    prompt: &PromptTemplate,
    inputs: &PromptInputs,
) -> Result<T, JudgeError> {
    let value = judge.predict(T::SCHEMA, prompt, inputs).await?;
    Ok(T::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedJudge;
    use clausewise_core::ClauseComplianceCheck;
    use serde_json::json;

    fn inputs() -> PromptInputs {
        PromptInputs::new()
            .with("clause_text", "c")
            .with("guideline_text", "g")
    }

    #[tokio::test]
    async fn test_structured_predict_validates() {
        let judge = ScriptedJudge::new().respond(json!({"clause_text": "c", "compliant": 1}));
        let result: Result<ClauseComplianceCheck, _> =
            structured_predict(&judge, &prompts::CONTRACT_MATCH, &inputs()).await;
        let err = result.unwrap_err();
        assert!(err.is_schema_mismatch(), "unexpected error {:?}", err);
    }

    #[tokio::test]
    async fn test_structured_predict_deserializes() {
        let judge = ScriptedJudge::new().respond(json!({
            "clause_text": "c",
            "matched_guideline": {"guideline_text": "g"},
            "compliant": true,
            "notes": "fine"
        }));
        let check: ClauseComplianceCheck =
            structured_predict(&judge, &prompts::CONTRACT_MATCH, &inputs())
                .await
                .unwrap();
        assert!(check.compliant);
        assert_eq!(check.guideline_text(), Some("g"));
    }

    #[test]
    fn test_provider_error_is_not_schema_mismatch() {
        let err = JudgeError::from(ProviderError::AuthError);
        assert!(!err.is_schema_mismatch());
    }
}
