//! Test doubles shared across the crate's unit tests.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use clausewise_core::SchemaKind;
pub use tempfile::TempDir;

use crate::judge::{JudgeError, PromptInputs, PromptTemplate, StructuredJudge};
use crate::providers::ProviderError;
use crate::retrieval::{GuidelinePassage, GuidelineRetriever, RetrievalError};
use crate::usage::LlmUsage;

type Responder = Box<dyn Fn(SchemaKind, &PromptInputs) -> Result<Value, JudgeError> + Send + Sync>;

/// One recorded judge call.
#[derive(Debug, Clone)]
pub struct JudgeCall {
    pub schema: SchemaKind,
    pub template: &'static str,
    pub inputs: PromptInputs,
}

/// Judge that answers from a closure and records every call.
pub struct ScriptedJudge {
    responder: Responder,
    calls: Mutex<Vec<JudgeCall>>,
}

impl ScriptedJudge {
    /// A judge that fails every call until given a responder.
    pub fn new() -> Self {
        Self::with_responder(|_, _| {
            Err(JudgeError::Provider(ProviderError::NotConfigured(
                "scripted judge has no response".to_string(),
            )))
        })
    }

    pub fn with_responder(
        responder: impl Fn(SchemaKind, &PromptInputs) -> Result<Value, JudgeError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with `value`.
    pub fn respond(self, value: Value) -> Self {
        Self {
            responder: Box::new(move |_, _| Ok(value.clone())),
            calls: self.calls,
        }
    }

    pub fn calls(&self) -> Vec<JudgeCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, schema: SchemaKind) -> usize {
        self.calls.lock().iter().filter(|c| c.schema == schema).count()
    }
}

#[async_trait]
impl StructuredJudge for ScriptedJudge {
    async fn predict(
        &self,
        schema: SchemaKind,
        prompt: &PromptTemplate,
        inputs: &PromptInputs,
    ) -> Result<Value, JudgeError> {
        self.calls.lock().push(JudgeCall {
            schema,
            template: prompt.name,
            inputs: inputs.clone(),
        });
        (self.responder)(schema, inputs)
    }

    fn usage(&self) -> LlmUsage {
        LlmUsage {
            llm_calls: self.calls.lock().len() as u32,
            ..LlmUsage::default()
        }
    }
}

/// Retriever with fixed answers per query.
///
/// Unknown queries return no passages.
#[derive(Default)]
pub struct StaticRetriever {
    answers: HashMap<String, Result<Vec<GuidelinePassage>, String>>,
}

impl StaticRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: &str, passages: &[&str]) -> Self {
        let passages = passages.iter().map(|p| GuidelinePassage::new(*p)).collect();
        self.answers.insert(query.to_string(), Ok(passages));
        self
    }

    pub fn failing(mut self, query: &str, message: &str) -> Self {
        self.answers
            .insert(query.to_string(), Err(message.to_string()));
        self
    }
}

#[async_trait]
impl GuidelineRetriever for StaticRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<GuidelinePassage>, RetrievalError> {
        match self.answers.get(query) {
            Some(Ok(passages)) => Ok(passages.clone()),
            Some(Err(message)) => Err(RetrievalError::Backend(message.clone())),
            None => Ok(Vec::new()),
        }
    }
}

/// Temp directory prefixed with `name`, removed on drop.
pub fn temp_dir(name: &str) -> TempDir {
    tempfile::Builder::new()
        .prefix(&format!("clausewise-{}-", name))
        .tempdir()
        .expect("create temp dir")
}

/// Writes fixture files into a test directory.
pub trait FixtureDir {
    fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf;
}

impl FixtureDir for TempDir {
    fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, contents).expect("write fixture");
        path
    }
}
