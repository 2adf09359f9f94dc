//! Run-level errors.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cache::CacheError;
use crate::documents::LoaderError;
use crate::judge::JudgeError;
use crate::orchestrator::{PipelineState, StepKind};
use crate::retrieval::RetrievalError;

/// Errors that end a review run.
///
/// Per-clause matching failures never appear here; they become failed
/// compliance records instead.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Cached extraction at {} is invalid: {reason}", path.display())]
    CacheCorruption { path: PathBuf, reason: String },

    #[error("Invalid extraction: {0}")]
    ExtractionSchemaMismatch(#[source] JudgeError),

    #[error("Invalid compliance report: {0}")]
    ReportSchemaMismatch(#[source] JudgeError),

    #[error("Source not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("Judge call failed: {0}")]
    Judge(#[source] JudgeError),

    #[error("Failed to load documents: {0}")]
    Loader(#[source] LoaderError),

    #[error("Guideline retrieval failed: {0}")]
    Retrieval(#[source] RetrievalError),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Run exceeded {0:?}")]
    Timeout(Duration),

    #[error("No transition from {from:?} on {step:?}")]
    InvalidTransition { from: PipelineState, step: StepKind },

    #[error("Workflow not configured: {0}")]
    NotConfigured(String),

    #[error("Run aborted: {0}")]
    Aborted(String),
}

impl From<CacheError> for ReviewError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Corrupt { path, reason } => ReviewError::CacheCorruption { path, reason },
            CacheError::Io { path, source } => ReviewError::Io { path, source },
        }
    }
}

impl From<LoaderError> for ReviewError {
    fn from(err: LoaderError) -> Self {
        match err {
            LoaderError::MissingSource(path) => ReviewError::MissingSource(path),
            other => ReviewError::Loader(other),
        }
    }
}

impl From<RetrievalError> for ReviewError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::MissingSource(path) => ReviewError::MissingSource(path),
            other => ReviewError::Retrieval(other),
        }
    }
}

/// Render an error with its full source chain.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;

    #[test]
    fn test_cache_error_maps_to_corruption() {
        let err = ReviewError::from(CacheError::Corrupt {
            path: PathBuf::from("out/contract_extraction.json"),
            reason: "missing clauses".to_string(),
        });
        assert!(matches!(err, ReviewError::CacheCorruption { .. }));
    }

    #[test]
    fn test_missing_sources_unify() {
        let from_loader = ReviewError::from(LoaderError::MissingSource(PathBuf::from("c.md")));
        let from_retrieval =
            ReviewError::from(RetrievalError::MissingSource(PathBuf::from("guidelines")));
        assert!(matches!(from_loader, ReviewError::MissingSource(_)));
        assert!(matches!(from_retrieval, ReviewError::MissingSource(_)));
    }

    #[test]
    fn test_error_chain_skips_repeats() {
        let err = ReviewError::Judge(JudgeError::Provider(ProviderError::AuthError));
        assert_eq!(
            error_chain(&err),
            "Judge call failed: LLM call failed: Authentication failed"
        );
    }
}
