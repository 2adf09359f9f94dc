//! # clausewise-runtime
//!
//! Async contract compliance review for Clausewise.
//!
//! A review runs three stages in strict sequence:
//!
//! 1. **Extraction** turns the contract into structured clauses, reusing a
//!    cached extraction when one exists for the output directory.
//! 2. **Matching** retrieves the best guideline for each clause and asks the
//!    judge whether the clause complies, retrying transient failures and
//!    recording a failed verdict when retries run out.
//! 3. **Report** synthesizes one compliance report from every verdict.
//!
//! Progress is published on an event stream while the run proceeds, and the
//! final [`ReviewOutcome`] can be awaited separately.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use clausewise_runtime::{
//!     build_provider, CompletionConfig, LexicalRetriever, LlmJudge, ReviewConfig, Workflow,
//! };
//!
//! let config = ReviewConfig::default().with_env_overrides()?;
//! let provider = build_provider(&config.llm)?;
//! let judge = Arc::new(LlmJudge::new(provider, CompletionConfig::from_settings(&config.llm)));
//! let retriever = LexicalRetriever::from_directory(
//!     &config.retrieval.guidelines_dir,
//!     config.retrieval.similarity_top_k,
//! ).await?;
//!
//! let workflow = Workflow::builder()
//!     .judge(judge)
//!     .retriever(Arc::new(retriever))
//!     .config(&config)
//!     .build()?;
//!
//! let outcome = workflow.run("data/vendor_agreement.md")?.await?;
//! println!("{}", outcome.report);
//! ```

pub mod cache;
pub mod config;
pub mod documents;
pub mod error;
pub mod events;
pub mod judge;
pub mod orchestrator;
pub mod providers;
pub mod retrieval;
pub mod stages;
pub mod usage;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{CacheError, ExtractionCache};
pub use config::{
    ConfigError, LlmSettings, LoaderKind, MatchingPolicy, ProviderKind, RetrievalSettings,
    ReviewConfig,
};
pub use documents::{
    loader_for, DirectoryLoader, Document, DocumentLoader, FileLoader, LoaderError, MetadataMode,
};
pub use error::ReviewError;
pub use events::{EventSink, ProgressEvent, WorkflowEvent};
pub use judge::{structured_predict, JudgeError, LlmJudge, PromptInputs, PromptTemplate, StructuredJudge};
pub use orchestrator::{
    PipelineState, ReviewHandle, ReviewOutcome, StepKind, Workflow, WorkflowBuilder,
};
pub use providers::{
    build_provider, ApiCredential, ChatMessage, CompletionConfig, CompletionResponse,
    CredentialSource, LlmProvider, ProviderError, Role, TokenUsage,
};
pub use retrieval::{GuidelinePassage, GuidelineRetriever, LexicalRetriever, RetrievalError};
pub use stages::{ExtractionStage, MatchingStage, ReportStage};
pub use usage::{LlmUsage, UsageTracker};
